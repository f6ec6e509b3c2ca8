use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row, params};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::models::{
    AssigneeDistribution, Issue, Label, LabelDistribution, Module, ModuleCounts, ModuleFavorite,
    ModuleLink, ModuleRecord, ModuleUpdate, ModuleUserProperties, Project, State, User,
};

/// Generate a fresh entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Database { conn })
    }

    /// Create the schema tables if they don't exist, then run any pending
    /// version-gated migrations.
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id           TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                name         TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id           TEXT PRIMARY KEY,
                first_name   TEXT,
                last_name    TEXT,
                display_name TEXT NOT NULL,
                avatar       TEXT
            );

            CREATE TABLE IF NOT EXISTS states (
                id          TEXT PRIMARY KEY,
                project_id  TEXT NOT NULL REFERENCES projects(id),
                name        TEXT NOT NULL,
                state_group TEXT
            );

            CREATE TABLE IF NOT EXISTS labels (
                id         TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                name       TEXT NOT NULL,
                color      TEXT
            );

            CREATE TABLE IF NOT EXISTS issues (
                id           TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL,
                project_id   TEXT NOT NULL REFERENCES projects(id),
                name         TEXT NOT NULL,
                state_id     TEXT REFERENCES states(id),
                parent_id    TEXT REFERENCES issues(id),
                completed_at TEXT,
                archived_at  TEXT,
                is_draft     INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS issue_assignees (
                issue_id    TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
                assignee_id TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (issue_id, assignee_id)
            );

            CREATE TABLE IF NOT EXISTS issue_labels (
                issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
                label_id TEXT NOT NULL REFERENCES labels(id),
                PRIMARY KEY (issue_id, label_id)
            );

            CREATE TABLE IF NOT EXISTS modules (
                id               TEXT PRIMARY KEY,
                workspace_id     TEXT NOT NULL,
                project_id       TEXT NOT NULL REFERENCES projects(id),
                name             TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                description_text TEXT,
                description_html TEXT,
                start_date       TEXT,
                target_date      TEXT,
                status           TEXT NOT NULL DEFAULT 'planned',
                lead_id          TEXT REFERENCES users(id),
                view_props       TEXT NOT NULL DEFAULT '{}',
                sort_order       REAL NOT NULL DEFAULT 65535,
                external_source  TEXT,
                external_id      TEXT,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS module_members (
                module_id TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                member_id TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (module_id, member_id)
            );

            CREATE TABLE IF NOT EXISTS module_issues (
                module_id    TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                issue_id     TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
                workspace_id TEXT NOT NULL,
                project_id   TEXT NOT NULL,
                PRIMARY KEY (module_id, issue_id)
            );

            CREATE TABLE IF NOT EXISTS module_favorites (
                user_id    TEXT NOT NULL REFERENCES users(id),
                module_id  TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                project_id TEXT NOT NULL,
                PRIMARY KEY (user_id, module_id)
            );

            CREATE TABLE IF NOT EXISTS module_links (
                id         TEXT PRIMARY KEY,
                module_id  TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                project_id TEXT NOT NULL,
                title      TEXT NOT NULL DEFAULT '',
                url        TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS module_user_properties (
                user_id            TEXT NOT NULL REFERENCES users(id),
                module_id          TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                project_id         TEXT NOT NULL,
                filters            TEXT NOT NULL DEFAULT '{}',
                display_filters    TEXT NOT NULL DEFAULT '{}',
                display_properties TEXT NOT NULL DEFAULT '{}',
                PRIMARY KEY (user_id, module_id)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_modules_external
                ON modules(project_id, external_source, external_id)
                WHERE external_source IS NOT NULL AND external_id IS NOT NULL;

            CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(workspace_id, project_id);
            CREATE INDEX IF NOT EXISTS idx_issues_state ON issues(state_id);
            CREATE INDEX IF NOT EXISTS idx_modules_project ON modules(workspace_id, project_id);
            CREATE INDEX IF NOT EXISTS idx_module_issues_issue ON module_issues(issue_id);
            CREATE INDEX IF NOT EXISTS idx_module_links_module ON module_links(module_id);
            ",
        )?;

        // Fresh databases get version 0.
        self.conn.execute(
            "INSERT OR IGNORE INTO config (key, value) VALUES ('schema_version', '0')",
            [],
        )?;

        run_migrations(&self.conn)
    }

    // -- Config --

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(v) => Ok(Some(v?)),
            None => Ok(None),
        }
    }

    // -- Projects, users, states, labels --

    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT INTO projects (id, workspace_id, name) VALUES (?1, ?2, ?3)",
            params![project.id, project.workspace_id, project.name],
        )?;
        Ok(())
    }

    pub fn get_project(&self, workspace_id: &str, project_id: &str) -> Result<Option<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workspace_id, name FROM projects WHERE workspace_id = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query_map(params![workspace_id, project_id], |row| {
            Ok(Project {
                id: row.get(0)?,
                workspace_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        match rows.next() {
            Some(p) => Ok(Some(p?)),
            None => Ok(None),
        }
    }

    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, first_name, last_name, display_name, avatar)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.display_name,
                user.avatar
            ],
        )?;
        Ok(())
    }

    pub fn insert_state(&self, state: &State) -> Result<()> {
        self.conn.execute(
            "INSERT INTO states (id, project_id, name, state_group) VALUES (?1, ?2, ?3, ?4)",
            params![
                state.id,
                state.project_id,
                state.name,
                state.group.map(|g| g.as_str())
            ],
        )?;
        Ok(())
    }

    pub fn insert_label(&self, label: &Label) -> Result<()> {
        self.conn.execute(
            "INSERT INTO labels (id, project_id, name, color) VALUES (?1, ?2, ?3, ?4)",
            params![label.id, label.project_id, label.name, label.color],
        )?;
        Ok(())
    }

    // -- Issues --

    pub fn insert_issue(&self, issue: &Issue) -> Result<()> {
        self.conn.execute(
            "INSERT INTO issues (id, workspace_id, project_id, name, state_id, parent_id,
                                 completed_at, archived_at, is_draft, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                issue.id,
                issue.workspace_id,
                issue.project_id,
                issue.name,
                issue.state_id,
                issue.parent_id,
                issue.completed_at.map(|t| t.to_rfc3339()),
                issue.archived_at.map(|t| t.to_rfc3339()),
                issue.is_draft as i64,
                issue.created_at.to_rfc3339(),
                issue.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_issue(&self, id: &str) -> Result<Option<Issue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workspace_id, project_id, name, state_id, parent_id,
                    completed_at, archived_at, is_draft, created_at, updated_at
             FROM issues WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_issue)?;
        match rows.next() {
            Some(i) => Ok(Some(i?)),
            None => Ok(None),
        }
    }

    pub fn set_issue_state(&self, issue_id: &str, state_id: Option<&str>) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        Ok(self.conn.execute(
            "UPDATE issues SET state_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![state_id, now, issue_id],
        )?)
    }

    pub fn complete_issue(&self, issue_id: &str, at: DateTime<Utc>) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        Ok(self.conn.execute(
            "UPDATE issues SET completed_at = ?1, updated_at = ?2 WHERE id = ?3",
            params![at.to_rfc3339(), now, issue_id],
        )?)
    }

    pub fn archive_issue(&self, issue_id: &str, at: DateTime<Utc>) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        Ok(self.conn.execute(
            "UPDATE issues SET archived_at = ?1, updated_at = ?2 WHERE id = ?3",
            params![at.to_rfc3339(), now, issue_id],
        )?)
    }

    pub fn assign_issue(&self, issue_id: &str, assignee_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO issue_assignees (issue_id, assignee_id) VALUES (?1, ?2)",
            params![issue_id, assignee_id],
        )?;
        Ok(())
    }

    pub fn label_issue(&self, issue_id: &str, label_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO issue_labels (issue_id, label_id) VALUES (?1, ?2)",
            params![issue_id, label_id],
        )?;
        Ok(())
    }

    // -- Modules --

    pub fn insert_module(&self, module: &Module) -> Result<()> {
        self.conn.execute(
            "INSERT INTO modules (id, workspace_id, project_id, name, description,
                                  description_text, description_html, start_date, target_date,
                                  status, lead_id, view_props, sort_order, external_source,
                                  external_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                module.id,
                module.workspace_id,
                module.project_id,
                module.name,
                module.description,
                module.description_text.as_ref().map(|v| v.to_string()),
                module.description_html.as_ref().map(|v| v.to_string()),
                module.start_date.map(|d| d.to_string()),
                module.target_date.map(|d| d.to_string()),
                module.status.as_str(),
                module.lead_id,
                module.view_props.to_string(),
                module.sort_order,
                module.external_source,
                module.external_id,
                module.created_at.to_rfc3339(),
                module.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_module(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
    ) -> Result<Option<Module>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workspace_id, project_id, name, description, description_text,
                    description_html, start_date, target_date, status, lead_id, view_props,
                    sort_order, external_source, external_id, created_at, updated_at
             FROM modules WHERE workspace_id = ?1 AND project_id = ?2 AND id = ?3",
        )?;
        let mut rows = stmt.query_map(params![workspace_id, project_id, module_id], row_to_module)?;
        match rows.next() {
            Some(m) => Ok(Some(m?)),
            None => Ok(None),
        }
    }

    /// Apply only the provided fields, mirroring a partial PATCH. Returns the
    /// number of rows changed (0 means the module does not exist).
    pub fn update_module(&self, module_id: &str, changes: &ModuleUpdate) -> Result<usize> {
        let mut sets = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut idx = 1;

        if let Some(name) = &changes.name {
            sets.push(format!("name = ?{idx}"));
            values.push(Box::new(name.clone()));
            idx += 1;
        }
        if let Some(description) = &changes.description {
            sets.push(format!("description = ?{idx}"));
            values.push(Box::new(description.clone()));
            idx += 1;
        }
        if let Some(text) = &changes.description_text {
            sets.push(format!("description_text = ?{idx}"));
            values.push(Box::new(text.to_string()));
            idx += 1;
        }
        if let Some(html) = &changes.description_html {
            sets.push(format!("description_html = ?{idx}"));
            values.push(Box::new(html.to_string()));
            idx += 1;
        }
        if let Some(date) = changes.start_date {
            sets.push(format!("start_date = ?{idx}"));
            values.push(Box::new(date.to_string()));
            idx += 1;
        }
        if let Some(date) = changes.target_date {
            sets.push(format!("target_date = ?{idx}"));
            values.push(Box::new(date.to_string()));
            idx += 1;
        }
        if let Some(status) = changes.status {
            sets.push(format!("status = ?{idx}"));
            values.push(Box::new(status.as_str().to_string()));
            idx += 1;
        }
        if let Some(lead) = &changes.lead_id {
            sets.push(format!("lead_id = ?{idx}"));
            values.push(Box::new(lead.clone()));
            idx += 1;
        }
        if let Some(props) = &changes.view_props {
            sets.push(format!("view_props = ?{idx}"));
            values.push(Box::new(props.to_string()));
            idx += 1;
        }
        if let Some(order) = changes.sort_order {
            sets.push(format!("sort_order = ?{idx}"));
            values.push(Box::new(order));
            idx += 1;
        }

        sets.push(format!("updated_at = ?{idx}"));
        values.push(Box::new(Utc::now().to_rfc3339()));
        idx += 1;

        let sql = format!("UPDATE modules SET {} WHERE id = ?{idx}", sets.join(", "));
        values.push(Box::new(module_id.to_string()));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        let changed = self.conn.execute(&sql, params_ref.as_slice())?;

        if let Some(members) = &changes.members {
            self.set_module_members(module_id, members)?;
        }
        Ok(changed)
    }

    /// Delete a module. Links, favorites, member rows, web links, and saved
    /// user properties go with it via foreign-key cascade; issues stay.
    pub fn delete_module(&self, module_id: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM modules WHERE id = ?1", params![module_id])?)
    }

    /// True when another module in the project already carries this
    /// external_source/external_id pair.
    pub fn external_module_exists(
        &self,
        project_id: &str,
        external_source: &str,
        external_id: &str,
    ) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM modules
             WHERE project_id = ?1 AND external_source = ?2 AND external_id = ?3",
            params![project_id, external_source, external_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Replace the member set of a module.
    pub fn set_module_members(&self, module_id: &str, member_ids: &[String]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM module_members WHERE module_id = ?1",
            params![module_id],
        )?;
        for member in member_ids {
            tx.execute(
                "INSERT OR IGNORE INTO module_members (module_id, member_id) VALUES (?1, ?2)",
                params![module_id, member],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // -- Module-issue links --

    /// Bulk-attach issues to a module in one transaction. Existing
    /// (module, issue) pairs are skipped, not errors.
    pub fn attach_issues(
        &self,
        module_id: &str,
        workspace_id: &str,
        project_id: &str,
        issue_ids: &[String],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for issue_id in issue_ids {
            tx.execute(
                "INSERT OR IGNORE INTO module_issues (module_id, issue_id, workspace_id, project_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![module_id, issue_id, workspace_id, project_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Symmetric bulk attach from the issue side.
    pub fn attach_modules(
        &self,
        issue_id: &str,
        workspace_id: &str,
        project_id: &str,
        module_ids: &[String],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for module_id in module_ids {
            tx.execute(
                "INSERT OR IGNORE INTO module_issues (module_id, issue_id, workspace_id, project_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![module_id, issue_id, workspace_id, project_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove one link row; returns the number of rows deleted.
    pub fn detach_issue(&self, module_id: &str, issue_id: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM module_issues WHERE module_id = ?1 AND issue_id = ?2",
            params![module_id, issue_id],
        )?)
    }

    /// Ids of all issues currently linked to a module, in link order.
    pub fn module_issue_ids(&self, module_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT issue_id FROM module_issues WHERE module_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![module_id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    // -- Favorites --

    /// Insert a favorite, ignoring duplicates. Returns true when a row was
    /// actually inserted; a concurrent duplicate resolves to a no-op here.
    pub fn insert_favorite(&self, favorite: &ModuleFavorite) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO module_favorites (user_id, module_id, project_id)
             VALUES (?1, ?2, ?3)",
            params![favorite.user_id, favorite.module_id, favorite.project_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_favorite(&self, user_id: &str, module_id: &str) -> Result<usize> {
        Ok(self.conn.execute(
            "DELETE FROM module_favorites WHERE user_id = ?1 AND module_id = ?2",
            params![user_id, module_id],
        )?)
    }

    // -- Module web links --

    pub fn insert_module_link(&self, link: &ModuleLink) -> Result<()> {
        self.conn.execute(
            "INSERT INTO module_links (id, module_id, project_id, title, url, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                link.id,
                link.module_id,
                link.project_id,
                link.title,
                link.url,
                link.created_by,
                link.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Web links for a module, newest first.
    pub fn module_links(&self, module_id: &str) -> Result<Vec<ModuleLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, module_id, project_id, title, url, created_by, created_at
             FROM module_links WHERE module_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![module_id], |row| {
            let created: String = row.get(6)?;
            Ok(ModuleLink {
                id: row.get(0)?,
                module_id: row.get(1)?,
                project_id: row.get(2)?,
                title: row.get(3)?,
                url: row.get(4)?,
                created_by: row.get(5)?,
                created_at: parse_ts(&created)?,
            })
        })?;
        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    // -- User properties --

    pub fn get_user_properties(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> Result<Option<ModuleUserProperties>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, module_id, project_id, filters, display_filters, display_properties
             FROM module_user_properties WHERE user_id = ?1 AND module_id = ?2",
        )?;
        let mut rows = stmt.query_map(params![user_id, module_id], |row| {
            Ok(ModuleUserProperties {
                user_id: row.get(0)?,
                module_id: row.get(1)?,
                project_id: row.get(2)?,
                filters: parse_json(row.get::<_, Option<String>>(3)?),
                display_filters: parse_json(row.get::<_, Option<String>>(4)?),
                display_properties: parse_json(row.get::<_, Option<String>>(5)?),
            })
        })?;
        match rows.next() {
            Some(p) => Ok(Some(p?)),
            None => Ok(None),
        }
    }

    /// Lazily create the per-(user, module) properties row. A concurrent
    /// create resolves via the primary-key conflict-ignore.
    pub fn ensure_user_properties(
        &self,
        user_id: &str,
        module_id: &str,
        project_id: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO module_user_properties (user_id, module_id, project_id)
             VALUES (?1, ?2, ?3)",
            params![user_id, module_id, project_id],
        )?;
        Ok(())
    }

    /// Patch only the provided blobs. Returns rows changed.
    pub fn update_user_properties(
        &self,
        user_id: &str,
        module_id: &str,
        filters: Option<&Value>,
        display_filters: Option<&Value>,
        display_properties: Option<&Value>,
    ) -> Result<usize> {
        let mut sets = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut idx = 1;

        if let Some(v) = filters {
            sets.push(format!("filters = ?{idx}"));
            values.push(Box::new(v.to_string()));
            idx += 1;
        }
        if let Some(v) = display_filters {
            sets.push(format!("display_filters = ?{idx}"));
            values.push(Box::new(v.to_string()));
            idx += 1;
        }
        if let Some(v) = display_properties {
            sets.push(format!("display_properties = ?{idx}"));
            values.push(Box::new(v.to_string()));
            idx += 1;
        }

        if sets.is_empty() {
            // Nothing to patch; report whether the row exists.
            return Ok(self.get_user_properties(user_id, module_id)?.map_or(0, |_| 1));
        }

        let sql = format!(
            "UPDATE module_user_properties SET {} WHERE user_id = ?{idx} AND module_id = ?{}",
            sets.join(", "),
            idx + 1
        );
        values.push(Box::new(user_id.to_string()));
        values.push(Box::new(module_id.to_string()));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            values.iter().map(|v| v.as_ref()).collect();
        Ok(self.conn.execute(&sql, params_ref.as_slice())?)
    }

    // -- Aggregation --

    /// All modules in a project annotated with `is_favorite`, member ids, and
    /// the six derived counts, ordered favorite-first then newest-created.
    ///
    /// One grouped aggregation query covers every module in the batch; the
    /// per-issue work never leaves SQLite.
    pub fn annotated_modules(
        &self,
        workspace_id: &str,
        project_id: &str,
        viewer_id: &str,
    ) -> Result<Vec<ModuleRecord>> {
        self.annotated_query(workspace_id, project_id, viewer_id, None)
    }

    /// Single-module variant of `annotated_modules`.
    pub fn annotated_module(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        viewer_id: &str,
    ) -> Result<Option<ModuleRecord>> {
        let mut records =
            self.annotated_query(workspace_id, project_id, viewer_id, Some(module_id))?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.remove(0))
        })
    }

    fn annotated_query(
        &self,
        workspace_id: &str,
        project_id: &str,
        viewer_id: &str,
        module_id: Option<&str>,
    ) -> Result<Vec<ModuleRecord>> {
        let mut sql = String::from(
            "SELECT m.id, m.workspace_id, m.project_id, m.name, m.description,
                    m.description_text, m.description_html, m.start_date, m.target_date,
                    m.status, m.lead_id, m.view_props, m.sort_order, m.external_source,
                    m.external_id, m.created_at, m.updated_at,
                    EXISTS(
                        SELECT 1 FROM module_favorites f
                        WHERE f.module_id = m.id AND f.user_id = ?3
                    ) AS is_favorite,
                    COALESCE(c.total_issues, 0),
                    COALESCE(c.completed_issues, 0),
                    COALESCE(c.cancelled_issues, 0),
                    COALESCE(c.started_issues, 0),
                    COALESCE(c.unstarted_issues, 0),
                    COALESCE(c.backlog_issues, 0)
             FROM modules m
             LEFT JOIN (",
        );
        sql.push_str(COUNTS_SUBQUERY);
        sql.push_str(
            ") c ON c.module_id = m.id
             WHERE m.workspace_id = ?1 AND m.project_id = ?2",
        );
        if module_id.is_some() {
            sql.push_str(" AND m.id = ?4");
        }
        // created_at has second resolution; rowid keeps ties deterministic.
        sql.push_str(" ORDER BY is_favorite DESC, m.created_at DESC, m.rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let map_row = |row: &Row| -> rusqlite::Result<ModuleRecord> {
            Ok(ModuleRecord {
                id: row.get(0)?,
                workspace_id: row.get(1)?,
                project_id: row.get(2)?,
                name: row.get(3)?,
                description: row.get(4)?,
                description_text: row.get::<_, Option<String>>(5)?.map(|s| parse_json(Some(s))),
                description_html: row.get::<_, Option<String>>(6)?.map(|s| parse_json(Some(s))),
                start_date: parse_date(row.get(7)?),
                target_date: parse_date(row.get(8)?),
                status: parse_status(&row.get::<_, String>(9)?),
                lead_id: row.get(10)?,
                member_ids: Vec::new(),
                view_props: parse_json(row.get::<_, Option<String>>(11)?),
                sort_order: row.get(12)?,
                external_source: row.get(13)?,
                external_id: row.get(14)?,
                is_favorite: row.get::<_, i64>(17)? != 0,
                counts: ModuleCounts {
                    total_issues: row.get(18)?,
                    completed_issues: row.get(19)?,
                    cancelled_issues: row.get(20)?,
                    started_issues: row.get(21)?,
                    unstarted_issues: row.get(22)?,
                    backlog_issues: row.get(23)?,
                },
                created_at: parse_ts(&row.get::<_, String>(15)?)?,
                updated_at: parse_ts(&row.get::<_, String>(16)?)?,
            })
        };

        let mut records = Vec::new();
        if let Some(id) = module_id {
            let rows = stmt.query_map(params![workspace_id, project_id, viewer_id, id], map_row)?;
            for row in rows {
                records.push(row?);
            }
        } else {
            let rows = stmt.query_map(params![workspace_id, project_id, viewer_id], map_row)?;
            for row in rows {
                records.push(row?);
            }
        }

        // Member ids come from one bulk query, bucketed per module.
        let mut members = self.project_member_map(workspace_id, project_id)?;
        for record in &mut records {
            if let Some(ids) = members.remove(&record.id) {
                record.member_ids = ids;
            }
        }
        Ok(records)
    }

    /// Derived counts for a single module, without the record fields.
    pub fn module_counts(&self, module_id: &str) -> Result<ModuleCounts> {
        let mut sql = String::from("SELECT * FROM (");
        sql.push_str(COUNTS_SUBQUERY);
        sql.push_str(") WHERE module_id = ?1");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![module_id], |row| {
            Ok(ModuleCounts {
                total_issues: row.get(1)?,
                completed_issues: row.get(2)?,
                cancelled_issues: row.get(3)?,
                started_issues: row.get(4)?,
                unstarted_issues: row.get(5)?,
                backlog_issues: row.get(6)?,
            })
        })?;
        match rows.next() {
            Some(c) => Ok(c?),
            None => Ok(ModuleCounts::default()),
        }
    }

    /// Deduplicated member ids for every module in a project.
    fn project_member_map(
        &self,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT mm.module_id, mm.member_id
             FROM module_members mm
             JOIN modules m ON m.id = mm.module_id
             WHERE m.workspace_id = ?1 AND m.project_id = ?2
             ORDER BY mm.rowid ASC",
        )?;
        let rows = stmt.query_map(params![workspace_id, project_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (module_id, member_id) = row?;
            map.entry(module_id).or_default().push(member_id);
        }
        Ok(map)
    }

    /// Per-assignee issue counts for a module's detail view, one grouped
    /// query. Issues with no assignee land in a null-keyed bucket. Rows are
    /// ordered by assignee first name then last name; SQLite sorts nulls
    /// first under ASC, matching the intended collation.
    pub fn assignee_distribution(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
    ) -> Result<Vec<AssigneeDistribution>> {
        let mut stmt = self.conn.prepare(
            "SELECT ia.assignee_id, u.first_name, u.last_name, u.display_name, u.avatar,
                    SUM(CASE WHEN i.archived_at IS NULL AND i.is_draft = 0
                        THEN 1 ELSE 0 END),
                    SUM(CASE WHEN i.completed_at IS NOT NULL
                             AND i.archived_at IS NULL AND i.is_draft = 0
                        THEN 1 ELSE 0 END),
                    SUM(CASE WHEN i.completed_at IS NULL
                             AND i.archived_at IS NULL AND i.is_draft = 0
                        THEN 1 ELSE 0 END)
             FROM module_issues mi
             JOIN issues i ON i.id = mi.issue_id
             LEFT JOIN issue_assignees ia ON ia.issue_id = i.id
             LEFT JOIN users u ON u.id = ia.assignee_id
             WHERE mi.module_id = ?1 AND i.workspace_id = ?2 AND i.project_id = ?3
             GROUP BY ia.assignee_id
             ORDER BY u.first_name ASC, u.last_name ASC",
        )?;
        let rows = stmt.query_map(params![module_id, workspace_id, project_id], |row| {
            Ok(AssigneeDistribution {
                assignee_id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                display_name: row.get(3)?,
                avatar: row.get(4)?,
                total_issues: row.get(5)?,
                completed_issues: row.get(6)?,
                pending_issues: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Per-label issue counts for a module's detail view, ordered by label
    /// name (nulls first). Unlabelled issues land in a null-keyed bucket.
    pub fn label_distribution(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
    ) -> Result<Vec<LabelDistribution>> {
        let mut stmt = self.conn.prepare(
            "SELECT il.label_id, l.name, l.color,
                    SUM(CASE WHEN i.archived_at IS NULL AND i.is_draft = 0
                        THEN 1 ELSE 0 END),
                    SUM(CASE WHEN i.completed_at IS NOT NULL
                             AND i.archived_at IS NULL AND i.is_draft = 0
                        THEN 1 ELSE 0 END),
                    SUM(CASE WHEN i.completed_at IS NULL
                             AND i.archived_at IS NULL AND i.is_draft = 0
                        THEN 1 ELSE 0 END)
             FROM module_issues mi
             JOIN issues i ON i.id = mi.issue_id
             LEFT JOIN issue_labels il ON il.issue_id = i.id
             LEFT JOIN labels l ON l.id = il.label_id
             WHERE mi.module_id = ?1 AND i.workspace_id = ?2 AND i.project_id = ?3
             GROUP BY il.label_id
             ORDER BY l.name ASC",
        )?;
        let rows = stmt.query_map(params![module_id, workspace_id, project_id], |row| {
            Ok(LabelDistribution {
                label_id: row.get(0)?,
                label_name: row.get(1)?,
                color: row.get(2)?,
                total_issues: row.get(3)?,
                completed_issues: row.get(4)?,
                pending_issues: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Completion counts per calendar day for a module's countable issues.
    /// Input for the burndown series.
    pub fn completions_by_day(&self, module_id: &str) -> Result<Vec<(NaiveDate, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date(i.completed_at), COUNT(*)
             FROM module_issues mi
             JOIN issues i ON i.id = mi.issue_id
             WHERE mi.module_id = ?1 AND i.completed_at IS NOT NULL
               AND i.archived_at IS NULL AND i.is_draft = 0
             GROUP BY date(i.completed_at)
             ORDER BY date(i.completed_at) ASC",
        )?;
        let rows = stmt.query_map(params![module_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (day, count) = row?;
            if let Some(date) = parse_date(Some(day)) {
                out.push((date, count));
            }
        }
        Ok(out)
    }
}

/// Grouped per-module counts over linked issues. Archived and draft issues
/// never count; an issue whose state has no group counts toward the total
/// only, so the five group counts need not sum to it.
const COUNTS_SUBQUERY: &str = "
    SELECT mi.module_id AS module_id,
           SUM(CASE WHEN i.archived_at IS NULL AND i.is_draft = 0
               THEN 1 ELSE 0 END) AS total_issues,
           SUM(CASE WHEN s.state_group = 'completed'
                    AND i.archived_at IS NULL AND i.is_draft = 0
               THEN 1 ELSE 0 END) AS completed_issues,
           SUM(CASE WHEN s.state_group = 'cancelled'
                    AND i.archived_at IS NULL AND i.is_draft = 0
               THEN 1 ELSE 0 END) AS cancelled_issues,
           SUM(CASE WHEN s.state_group = 'started'
                    AND i.archived_at IS NULL AND i.is_draft = 0
               THEN 1 ELSE 0 END) AS started_issues,
           SUM(CASE WHEN s.state_group = 'unstarted'
                    AND i.archived_at IS NULL AND i.is_draft = 0
               THEN 1 ELSE 0 END) AS unstarted_issues,
           SUM(CASE WHEN s.state_group = 'backlog'
                    AND i.archived_at IS NULL AND i.is_draft = 0
               THEN 1 ELSE 0 END) AS backlog_issues
    FROM module_issues mi
    JOIN issues i ON i.id = mi.issue_id
    LEFT JOIN states s ON s.id = i.state_id
    GROUP BY mi.module_id
";

/// Read the current schema version from the config table.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let mut stmt = conn.prepare("SELECT value FROM config WHERE key = 'schema_version'")?;
    let mut rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    match rows.next() {
        Some(v) => v?.parse::<i32>().map_err(|e| {
            Error::validation("schema_version", format!("invalid value: {e}"))
        }),
        None => Ok(0),
    }
}

/// Persist the schema version to the config table.
#[allow(dead_code)]
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES ('schema_version', ?1)",
        params![version.to_string()],
    )?;
    Ok(())
}

/// Run all pending schema migrations in order.
///
/// Version 0 is the baseline created by the `CREATE TABLE IF NOT EXISTS`
/// block in `migrate()`; future migrations (v1, v2, ...) are added as
/// `if version < N` blocks here, each wrapped in a transaction.
fn run_migrations(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    // v0 is the baseline -- no ALTER TABLE statements needed yet.
    let _ = version;

    Ok(())
}

fn row_to_issue(row: &Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        project_id: row.get(2)?,
        name: row.get(3)?,
        state_id: row.get(4)?,
        parent_id: row.get(5)?,
        completed_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_ts(&s))
            .transpose()?,
        archived_at: row
            .get::<_, Option<String>>(7)?
            .map(|s| parse_ts(&s))
            .transpose()?,
        is_draft: row.get::<_, i64>(8)? != 0,
        created_at: parse_ts(&row.get::<_, String>(9)?)?,
        updated_at: parse_ts(&row.get::<_, String>(10)?)?,
    })
}

fn row_to_module(row: &Row) -> rusqlite::Result<Module> {
    Ok(Module {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        project_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        description_text: row.get::<_, Option<String>>(5)?.map(|s| parse_json(Some(s))),
        description_html: row.get::<_, Option<String>>(6)?.map(|s| parse_json(Some(s))),
        start_date: parse_date(row.get(7)?),
        target_date: parse_date(row.get(8)?),
        status: parse_status(&row.get::<_, String>(9)?),
        lead_id: row.get(10)?,
        view_props: parse_json(row.get::<_, Option<String>>(11)?),
        sort_order: row.get(12)?,
        external_source: row.get(13)?,
        external_id: row.get(14)?,
        created_at: parse_ts(&row.get::<_, String>(15)?)?,
        updated_at: parse_ts(&row.get::<_, String>(16)?)?,
    })
}

/// A malformed stored timestamp is data corruption; the read fails rather
/// than substituting a value.
fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_date(v: Option<String>) -> Option<NaiveDate> {
    v.and_then(|s| s.parse::<NaiveDate>().ok())
}

fn parse_json(v: Option<String>) -> Value {
    v.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

fn parse_status(s: &str) -> crate::models::ModuleStatus {
    crate::models::ModuleStatus::parse(s).unwrap_or_default()
}
