//! SQLite persistence for notebooks, notes and their component sets.

use crate::core::component::{ComponentConfig, ComponentInstance};
use crate::core::note::{AnalysisRecord, ComponentData, Note, Notebook};
use crate::core::sync::ComponentStore;
use crate::{DaylogError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const NOTE_COLUMNS: &str = "id, notebook_id, title, content_text, images_json, source, author,
     created_at, modified_at, upload_time, component_instances_json, component_data_json, analysis_json";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Creates a throwaway database that lives as long as the returned value.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Validate database structure
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('notebooks', 'notes', 'journal_meta')",
            [],
            |row| row.get(0),
        )?;

        if table_count != 3 {
            return Err(DaylogError::InvalidJournal("Not a valid Daylog database".to_string()));
        }

        // Older journals kept component content inline on the instances and
        // had no separate component_data or analysis columns.
        add_column_if_missing(&conn, "component_data_json", "TEXT NOT NULL DEFAULT '{}'")?;
        add_column_if_missing(&conn, "analysis_json", "TEXT")?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ── Notebooks ─────────────────────────────────────────────────

    pub fn insert_notebook(&self, notebook: &Notebook) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notebooks (id, name, component_config_json, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notebook.notebook_id,
                notebook.name,
                serde_json::to_string(&notebook.component_config)?,
                notebook.created_at,
                notebook.modified_at,
            ],
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DaylogError::NotebookNotFound`] if no notebook has `notebook_id`,
    /// or [`DaylogError::Json`] if its stored config is corrupt.
    pub fn get_notebook(&self, notebook_id: &str) -> Result<Notebook> {
        let row = self
            .conn
            .query_row(
                "SELECT b.id, b.name, b.component_config_json, b.created_at, b.modified_at,
                        (SELECT COUNT(*) FROM notes n WHERE n.notebook_id = b.id)
                 FROM notebooks b WHERE b.id = ?1",
                [notebook_id],
                map_notebook_row,
            )
            .optional()?
            .ok_or_else(|| DaylogError::NotebookNotFound(notebook_id.to_string()))?;
        notebook_from_row(row)
    }

    /// All notebooks, oldest first.
    pub fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.name, b.component_config_json, b.created_at, b.modified_at,
                    (SELECT COUNT(*) FROM notes n WHERE n.notebook_id = b.id)
             FROM notebooks b
             ORDER BY b.created_at, b.id",
        )?;
        let rows = stmt
            .query_map([], map_notebook_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(notebook_from_row).collect()
    }

    /// Deletes a notebook and every note in it; returns the number of notes removed.
    pub fn delete_notebook(&mut self, notebook_id: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let notes = tx.execute("DELETE FROM notes WHERE notebook_id = ?1", [notebook_id])?;
        if tx.execute("DELETE FROM notebooks WHERE id = ?1", [notebook_id])? == 0 {
            return Err(DaylogError::NotebookNotFound(notebook_id.to_string()));
        }
        tx.commit()?;
        Ok(notes)
    }

    // ── Notes ─────────────────────────────────────────────────────

    pub fn insert_note(&self, note: &Note) -> Result<()> {
        let analysis_json = note.analysis.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
            params![
                note.note_id,
                note.notebook_id,
                note.title,
                note.content_text,
                serde_json::to_string(&note.images)?,
                note.source,
                note.author,
                note.created_at,
                note.modified_at,
                note.upload_time,
                serde_json::to_string(&note.component_instances)?,
                serde_json::to_string(&note.component_data)?,
                analysis_json,
            ],
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DaylogError::NoteNotFound`] if no note has `note_id`, or
    /// [`DaylogError::Json`] if one of its JSON columns is corrupt.
    pub fn get_note(&self, note_id: &str) -> Result<Note> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [note_id],
                map_note_row,
            )
            .optional()?
            .ok_or_else(|| DaylogError::NoteNotFound(note_id.to_string()))?;
        note_from_row(row)
    }

    /// Notes in `notebook_id`, oldest first.
    pub fn list_notes_in(&self, notebook_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE notebook_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt
            .query_map([notebook_id], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(note_from_row).collect()
    }

    pub fn update_note_components(&self, note_id: &str, instances: &[ComponentInstance]) -> Result<()> {
        self.update_note_column(note_id, "component_instances_json", serde_json::to_string(instances)?)
    }

    pub fn update_component_data(&self, note_id: &str, data: &ComponentData) -> Result<()> {
        self.update_note_column(note_id, "component_data_json", serde_json::to_string(data)?)
    }

    pub fn update_analysis(&self, note_id: &str, analysis: &AnalysisRecord) -> Result<()> {
        self.update_note_column(note_id, "analysis_json", serde_json::to_string(analysis)?)
    }

    pub fn delete_note(&self, note_id: &str) -> Result<()> {
        if self.conn.execute("DELETE FROM notes WHERE id = ?1", [note_id])? == 0 {
            return Err(DaylogError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }

    /// `column` is always one of this module's constants, never user input.
    fn update_note_column(&self, note_id: &str, column: &str, json: String) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let changed = self.conn.execute(
            &format!("UPDATE notes SET {column} = ?1, modified_at = ?2 WHERE id = ?3"),
            params![json, now, note_id],
        )?;
        // SQLite UPDATE on a missing row succeeds but touches zero rows.
        if changed == 0 {
            return Err(DaylogError::NoteNotFound(note_id.to_string()));
        }
        Ok(())
    }
}

impl ComponentStore for Storage {
    fn component_config(&self, notebook_id: &str) -> Result<ComponentConfig> {
        let json: String = self
            .conn
            .query_row(
                "SELECT component_config_json FROM notebooks WHERE id = ?1",
                [notebook_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DaylogError::NotebookNotFound(notebook_id.to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save_component_config(&mut self, notebook_id: &str, config: &ComponentConfig) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let changed = self.conn.execute(
            "UPDATE notebooks SET component_config_json = ?1, modified_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(config)?, now, notebook_id],
        )?;
        if changed == 0 {
            return Err(DaylogError::NotebookNotFound(notebook_id.to_string()));
        }
        Ok(())
    }

    fn list_notes(&self, notebook_id: &str) -> Result<Vec<Note>> {
        self.list_notes_in(notebook_id)
    }

    fn save_note_components(&mut self, note_id: &str, instances: &[ComponentInstance]) -> Result<()> {
        self.update_note_components(note_id, instances)
    }
}

fn add_column_if_missing(conn: &Connection, column: &str, definition: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('notes') WHERE name = ?1",
        [column],
        |row| row.get::<_, i64>(0).map(|count| count > 0),
    )?;
    if !exists {
        log::info!("migrating notes table: adding column {column}");
        conn.execute(&format!("ALTER TABLE notes ADD COLUMN {column} {definition}"), [])?;
    }
    Ok(())
}

struct NotebookRow {
    id: String,
    name: String,
    config_json: String,
    created_at: i64,
    modified_at: i64,
    note_count: i64,
}

fn map_notebook_row(row: &rusqlite::Row) -> rusqlite::Result<NotebookRow> {
    Ok(NotebookRow {
        id: row.get(0)?,
        name: row.get(1)?,
        config_json: row.get(2)?,
        created_at: row.get(3)?,
        modified_at: row.get(4)?,
        note_count: row.get(5)?,
    })
}

fn notebook_from_row(row: NotebookRow) -> Result<Notebook> {
    Ok(Notebook {
        notebook_id: row.id,
        name: row.name,
        note_count: usize::try_from(row.note_count).unwrap_or(0),
        component_config: serde_json::from_str(&row.config_json)?,
        created_at: row.created_at,
        modified_at: row.modified_at,
    })
}

struct NoteRow {
    id: String,
    notebook_id: String,
    title: String,
    content_text: String,
    images_json: String,
    source: Option<String>,
    author: Option<String>,
    created_at: i64,
    modified_at: i64,
    upload_time: Option<i64>,
    instances_json: String,
    data_json: String,
    analysis_json: Option<String>,
}

fn map_note_row(row: &rusqlite::Row) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        notebook_id: row.get(1)?,
        title: row.get(2)?,
        content_text: row.get(3)?,
        images_json: row.get(4)?,
        source: row.get(5)?,
        author: row.get(6)?,
        created_at: row.get(7)?,
        modified_at: row.get(8)?,
        upload_time: row.get(9)?,
        instances_json: row.get(10)?,
        data_json: row.get(11)?,
        analysis_json: row.get(12)?,
    })
}

fn note_from_row(row: NoteRow) -> Result<Note> {
    let analysis = match row.analysis_json.as_deref() {
        Some(json) if !json.is_empty() => Some(serde_json::from_str(json)?),
        _ => None,
    };
    Ok(Note {
        note_id: row.id,
        notebook_id: row.notebook_id,
        title: row.title,
        content_text: row.content_text,
        images: serde_json::from_str(&row.images_json)?,
        source: row.source,
        author: row.author,
        created_at: row.created_at,
        modified_at: row.modified_at,
        upload_time: row.upload_time,
        component_instances: serde_json::from_str(&row.instances_json)?,
        component_data: serde_json::from_str(&row.data_json)?,
        analysis,
    })
}
