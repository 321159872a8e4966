use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::{client::OrsError, ors_api::OrsResponseType};

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Headers sent with a relayed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrsHeaders {
    pub accept: &'static str,
    pub authorization: Option<String>,
}

impl OrsHeaders {
    /// `body_api_key` is the `api_key` taken out of the request body. A non-empty
    /// `caller_authorization` always wins over it.
    pub fn new(
        response_type: OrsResponseType,
        body_api_key: Option<String>,
        caller_authorization: Option<&str>,
    ) -> Self {
        let authorization = match caller_authorization {
            Some(authorization) if !authorization.is_empty() => Some(authorization.to_owned()),
            _ => body_api_key,
        };

        OrsHeaders {
            accept: response_type.accept(),
            authorization,
        }
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, OrsError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));

        if let Some(authorization) = &self.authorization {
            let value = HeaderValue::from_str(authorization)
                .map_err(|_| OrsError::InvalidHeader("Authorization"))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}
