use crate::config::{AppConfig, UPLOAD_DIR};
use crate::job_controller::dispatcher::TaskDispatcher;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse, Responder};
use common::requests::UploadResponse;
use futures_util::StreamExt;
use log::warn;
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// HTTP handler for `POST /upload-csv/`.
///
/// - On success: `202 Accepted` with the task id.
/// - Without a `file` field, or when the upload cannot be stored: `400 Bad Request`.
pub(crate) async fn process(
    payload: Multipart,
    config: web::Data<AppConfig>,
    dispatcher: web::Data<TaskDispatcher>,
) -> impl Responder {
    match save_upload(payload, &config).await {
        Ok(Some(relative_path)) => {
            let task_id = dispatcher.enqueue(relative_path).await;
            HttpResponse::Accepted().json(UploadResponse { task_id })
        }
        Ok(None) => HttpResponse::BadRequest()
            .json(json!({ "detail": "No file uploaded (use form-data key 'file')." })),
        Err(e) => HttpResponse::BadRequest().json(json!({ "detail": format!("Error: {}", e) })),
    }
}

/// Writes the first `file` field under the upload folder and returns its path
/// relative to the media root. Other fields are skipped.
async fn save_upload(
    mut payload: Multipart,
    config: &AppConfig,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if name.as_deref() != Some("file") {
            continue;
        }

        let dir = config.upload_dir();
        fs::create_dir_all(&dir)?;
        let file_name = format!("{}.csv", Uuid::new_v4());
        let absolute = dir.join(&file_name);

        if let Err(e) = write_field(&mut field, &absolute, config.upload_limit_bytes).await {
            if let Err(cleanup) = fs::remove_file(&absolute) {
                warn!("Could not remove partial upload {}: {}", absolute.display(), cleanup);
            }
            return Err(e);
        }

        return Ok(Some(format!("{}/{}", UPLOAD_DIR, file_name)));
    }

    Ok(None)
}

async fn write_field(
    field: &mut Field,
    path: &Path,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0usize;

    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        written += chunk.len();
        if written > limit {
            return Err(format!("upload exceeds {} bytes", limit).into());
        }
        writer.write_all(&chunk)?;
    }

    writer.flush()?;
    Ok(())
}
