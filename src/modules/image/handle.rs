use actix_multipart::Multipart;
use actix_web::{delete, get, http::header, post, web, HttpRequest};
use futures_util::TryStreamExt;
use validator::Validate;

use crate::modules::image::{
    model::{self, UploadSource},
    schema::ImageRecord,
    service::{ImageService, IncomingFile},
};
use crate::{
    api::{error, success},
    utils::ValidatedJson,
};

const FILE_FIELD: &str = "file";

fn bad_request<E: std::fmt::Display>(e: E) -> error::Error {
    error::Error::bad_request(e.to_string())
}

/// Malformed path segments, such as a non-numeric id, read as a missing image.
pub fn path_error(err: actix_web::error::PathError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected path: {}", err);
    error::Error::not_found("Image not found").into()
}

fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name).first_or_octet_stream().essence_str().to_string()
}

/// Reads the `file` part of a multipart body, aborting as soon as it grows
/// past `limit`.
async fn read_multipart_file(
    mut multipart: Multipart,
    limit: usize,
) -> Result<IncomingFile, error::Error> {
    while let Some(mut field) = multipart.try_next().await.map_err(bad_request)? {
        if field.name() != Some(FILE_FIELD) {
            while field.try_next().await.map_err(bad_request)?.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        // Detect MIME type
        let declared = field.content_type().map(|m| m.essence_str().to_string());
        let content_type = match declared {
            Some(mime) if mime != "application/octet-stream" => mime,
            _ => file_name
                .as_deref()
                .map(guess_mime)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        };

        // Read file bytes
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_request)? {
            if bytes.len() + chunk.len() > limit {
                return Err(error::Error::bad_request(format!(
                    "File size exceeds maximum allowed size of {} bytes",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(IncomingFile { file_name, content_type, bytes, source: UploadSource::Multipart });
    }

    Err(error::Error::bad_request("No file uploaded"))
}

async fn read_json_body(mut payload: web::Payload, limit: usize) -> Result<Vec<u8>, error::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.try_next().await.map_err(bad_request)? {
        if body.len() + chunk.len() > limit {
            return Err(error::Error::bad_request("Request body too large"));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[post("/upload")]
pub async fn upload_image(
    image_service: web::Data<ImageService>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<success::Success<model::UploadResponse>, error::Error> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let file = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::new(req.headers(), payload);
        read_multipart_file(multipart, image_service.config().max_multipart_size).await?
    } else if content_type.starts_with("application/json") {
        let body = read_json_body(payload, image_service.config().max_json_body_size).await?;
        let upload: model::DataUrlUploadModel =
            serde_json::from_slice(&body).map_err(bad_request)?;
        upload.validate().map_err(bad_request)?;
        image_service.decode_data_url(&upload.file, upload.custom_name)?
    } else {
        return Err(error::Error::bad_request("Expected multipart/form-data or application/json"));
    };

    let response = image_service.upload_image(file).await?;
    Ok(success::Success::ok(response))
}

#[get("")]
pub async fn list_images(
    image_service: web::Data<ImageService>,
) -> Result<success::Success<Vec<ImageRecord>>, error::Error> {
    let images = image_service.list_images().await?;
    Ok(success::Success::ok(images))
}

#[get("/{short_code}")]
pub async fn get_image(
    image_service: web::Data<ImageService>,
    short_code: web::Path<String>,
) -> Result<success::Success<ImageRecord>, error::Error> {
    let image = image_service.get_image(&short_code.into_inner()).await?;
    Ok(success::Success::ok(image))
}

#[delete("/{id}")]
pub async fn delete_image(
    image_service: web::Data<ImageService>,
    id: web::Path<i64>,
) -> Result<success::Success<model::DeleteResponse>, error::Error> {
    let deleted = image_service.delete_image(id.into_inner()).await?;
    Ok(success::Success::ok(model::DeleteResponse { success: true, deleted }))
}

#[post("/migrate")]
pub async fn migrate_images(
    image_service: web::Data<ImageService>,
    body: ValidatedJson<model::MigrateModel>,
) -> Result<success::Success<model::MigrateResponse>, error::Error> {
    let images = match body.0.images {
        serde_json::Value::Array(images) => images,
        _ => return Err(error::Error::bad_request("images must be an array")),
    };
    let response = image_service.migrate_images(images).await?;
    Ok(success::Success::ok(response))
}

#[get("/health")]
pub async fn health(
    image_service: web::Data<ImageService>,
) -> Result<success::Success<model::HealthResponse>, error::Error> {
    let health = image_service.health().await?;
    Ok(success::Success::ok(health))
}
