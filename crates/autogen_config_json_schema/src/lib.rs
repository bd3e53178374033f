//! Writes `schema.json`, the JSON schema of the configuration file, at build time.
