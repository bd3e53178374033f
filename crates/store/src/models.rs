use diesel::{sql_types, QueryableByName};

/// One result row, serialized by Postgres as a JSON object.
#[derive(QueryableByName, Debug)]
pub struct JsonRow {
    #[diesel(sql_type = sql_types::Text)]
    pub row_json: String,
}

#[derive(QueryableByName, Debug)]
pub struct Exists {
    #[diesel(sql_type = sql_types::Bool)]
    pub found: bool,
}

#[derive(QueryableByName, Debug)]
pub struct ServerVersion {
    #[diesel(sql_type = sql_types::Text)]
    pub server_version: String,
}
