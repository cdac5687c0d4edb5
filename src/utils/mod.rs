use actix_web::{web, FromRequest};
use futures_util::future::LocalBoxFuture;
use validator::Validate;

use crate::api::error;

const MAX_NAME_CHARS: usize = 100;

pub struct ValidatedJson<T>(pub T);

impl<T> FromRequest for ValidatedJson<T>
where
    T: Validate + serde::de::DeserializeOwned + 'static,
{
    type Error = error::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let fut = web::Json::<T>::from_request(req, payload);

        Box::pin(async move {
            let json = fut.await.map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            let model = json.into_inner();
            model.validate().map_err(|e| error::Error::BadRequest(e.to_string().into()))?;
            Ok(ValidatedJson(model))
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '.' | '-')
        || c.is_whitespace()
        || ('\u{00C0}'..='\u{017F}').contains(&c)
        || ('\u{0600}'..='\u{06FF}').contains(&c)
        || ('\u{4E00}'..='\u{9FA5}').contains(&c)
}

/// Replaces disallowed characters with `_`, folds whitespace runs into a
/// single `_` and caps the result at 100 characters.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;

    for c in name.chars() {
        if !is_name_char(c) {
            out.push('_');
            in_space = false;
        } else if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }

    out.chars().take(MAX_NAME_CHARS).collect()
}

/// Splits a `data:<mime>;base64,<payload>` URL into its mime type and
/// base64 payload.
pub fn parse_data_url(data_url: &str) -> Result<(&str, &str), error::SystemError> {
    let invalid = || error::SystemError::bad_request("Invalid file format");

    let rest = data_url.strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;

    let mime_ok = !mime.is_empty()
        && mime.chars().all(|c| c.is_ascii_alphabetic() || matches!(c, '-' | '+' | '/'));
    if !mime_ok || payload.is_empty() {
        return Err(invalid());
    }

    Ok((mime, payload))
}

/// File extension for an image content type: the subtype, with `jpeg`
/// shortened to `jpg` and any structured suffix dropped.
pub fn extension_for(content_type: &str) -> String {
    let subtype = content_type.rsplit('/').next().unwrap_or(content_type);
    let subtype = subtype.split('+').next().unwrap_or(subtype);
    match subtype {
        "jpeg" => "jpg".to_string(),
        other => other.to_ascii_lowercase(),
    }
}
