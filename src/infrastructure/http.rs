use crate::domain::errors::CollaboratorError;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Sends `request` and decodes a JSON body out of a successful response.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    service: &'static str,
    request: RequestBuilder,
) -> Result<T, CollaboratorError> {
    let failed = |e: reqwest::Error| CollaboratorError::RequestFailed {
        service,
        message: e.to_string(),
    };

    let response = request
        .send()
        .await
        .map_err(failed)?
        .error_for_status()
        .map_err(failed)?;

    response
        .json::<T>()
        .await
        .map_err(|e| CollaboratorError::UnexpectedResponse {
            service,
            message: e.to_string(),
        })
}

pub(crate) fn unexpected(service: &'static str, message: impl Into<String>) -> CollaboratorError {
    CollaboratorError::UnexpectedResponse {
        service,
        message: message.into(),
    }
}
