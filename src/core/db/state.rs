use std::path::Path;

use sqlx::{
    Connection, SqliteConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous},
};
use tracing::error;

use crate::error::{CatalogError, Result};

fn connect_options(db_file: &Path, create: bool) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Delete)
        .synchronous(SqliteSynchronous::Full)
}

/// Open a fresh connection for a single catalog operation.
///
/// The caller closes it when the operation is done; on error paths it is
/// dropped, which closes it as well.
pub(super) async fn open(db_file: &Path) -> Result<SqliteConnection> {
    connect(db_file, false).await
}

/// Like [`open`], creating the database file and its parent directory first.
pub(super) async fn open_or_create(db_file: &Path) -> Result<SqliteConnection> {
    if let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| {
            error!("Please ensure you have write permissions for the directory: {:?}", parent);
            CatalogError::StorageIo {
                path: parent.to_path_buf(),
                source,
            }
        })?;
    }
    connect(db_file, true).await
}

async fn connect(db_file: &Path, create: bool) -> Result<SqliteConnection> {
    SqliteConnection::connect_with(&connect_options(db_file, create))
        .await
        .map_err(|e| {
            error!("Error accessing the database {:?}: {}", db_file, e);
            CatalogError::Storage(e)
        })
}
