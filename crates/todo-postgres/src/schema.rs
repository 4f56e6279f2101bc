//! Table definitions applied by [`PostgresTodoStore::migrate`](crate::PostgresTodoStore::migrate).

/// DDL statements, in the order they must run. Each is idempotent.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS projects (
    id       SERIAL PRIMARY KEY,
    projname TEXT NOT NULL UNIQUE
)",
    "CREATE TABLE IF NOT EXISTS todos (
    id          SERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    duedate     TIMESTAMPTZ,
    priority    TEXT NOT NULL DEFAULT '',
    completed   BOOLEAN NOT NULL DEFAULT FALSE,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    projname    TEXT NOT NULL REFERENCES projects (projname)
                ON UPDATE CASCADE ON DELETE CASCADE
)",
    "CREATE INDEX IF NOT EXISTS todos_projname_idx ON todos (projname)",
];

/// The whole schema as one script, for operators who apply it by hand.
pub fn schema_sql() -> String {
    let mut script = SCHEMA.join(";\n\n");
    script.push_str(";\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_precede_todos() {
        let projects = SCHEMA.iter().position(|s| s.contains("TABLE IF NOT EXISTS projects"));
        let todos = SCHEMA.iter().position(|s| s.contains("TABLE IF NOT EXISTS todos"));
        assert!(projects.unwrap() < todos.unwrap());
    }

    #[test]
    fn todos_follow_their_project() {
        let todos = SCHEMA[1];
        assert!(todos.contains("ON UPDATE CASCADE"));
        assert!(todos.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn script_terminates_every_statement() {
        let script = schema_sql();
        assert_eq!(script.matches(';').count(), SCHEMA.len());
        assert!(script.ends_with(";\n"));
    }
}
