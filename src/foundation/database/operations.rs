use crate::foundation::database::DownloadRecord;
use crate::foundation::utils::normalize_unicode;
use crate::foundation::Result;
use sled::Db;
use std::path::Path;

/// Opens the download history at the specified path.
///
/// Creates a new database or opens an existing one.
///
/// # Examples
///
/// ```no_run
/// use catalogdl::open_database;
/// let db = open_database("/path/to/history_db").unwrap();
/// ```
pub fn open_database(path: &str) -> Result<Db> {
    Ok(sled::open(path)?)
}

/// Records a finished download under its video id.
///
/// Re-downloading the same id overwrites the previous record, so the history
/// always points at the newest file.
///
/// # Examples
///
/// ```no_run
/// use catalogdl::{open_database, store_download, DownloadRecord};
///
/// let db = open_database("/path/to/history_db").unwrap();
/// let record = DownloadRecord {
///     artist: "King Von".to_string(),
///     title: "Crazy Story".to_string(),
///     path: "/music/King_Von_Music/Singles/Crazy Story.mp3".to_string(),
///     downloaded_at: 1_700_000_000,
/// };
/// store_download(&db, "dQw4w9WgXcQ", &record).unwrap();
/// ```
pub fn store_download(db: &Db, video_id: &str, record: &DownloadRecord) -> Result<()> {
    let serialized = bincode::serialize(record)?;
    db.insert(video_id.as_bytes(), serialized)?;
    Ok(())
}

/// Retrieves the record stored for a video id.
///
/// Returns `Ok(None)` when the id was never downloaded.
pub fn get_download(db: &Db, video_id: &str) -> Result<Option<DownloadRecord>> {
    db.get(video_id.as_bytes())?
        .map(|ivec| bincode::deserialize(&ivec).map_err(Into::into))
        .transpose()
}

/// Looks up a video id and returns the recorded file path if that file is still
/// on disk.
pub fn existing_download(db: &Db, video_id: &str) -> Result<Option<String>> {
    if video_id.is_empty() {
        return Ok(None);
    }

    Ok(get_download(db, video_id)?
        .map(|record| record.path)
        .filter(|path| Path::new(path).exists()))
}

/// Lists every record, optionally restricted to one artist.
///
/// Artist names are compared after Unicode normalization, so "Björk" matches
/// regardless of how the name was composed.
pub fn list_downloads(db: &Db, artist: Option<&str>) -> Result<Vec<(String, DownloadRecord)>> {
    let wanted = artist.map(normalize_unicode);
    let mut records = Vec::new();

    for entry in db.iter() {
        let (key, value) = entry?;
        let record: DownloadRecord = bincode::deserialize(&value)?;

        if let Some(wanted) = &wanted {
            if &normalize_unicode(&record.artist) != wanted {
                continue;
            }
        }

        records.push((String::from_utf8_lossy(&key).into_owned(), record));
    }

    records.sort_by(|a, b| a.1.downloaded_at.cmp(&b.1.downloaded_at));
    Ok(records)
}
