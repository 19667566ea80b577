use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use log::warn;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    errors::{Result, TransferError},
    service::TransferService,
};

/// Name under which the host shell registers this method channel.
pub const CHANNEL: &str = "io.gthink.expenses/file_operations";

pub const COPY_FILES: &str = "copy_files";
pub const PICK_FILE: &str = "pick_file";

pub type HandlerFuture = Pin<Box<dyn Future<Output = String> + Send + 'static>>;

pub trait Handler: Send + Sync {
    fn call(&self, args: Vec<String>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = String> + Send + 'static,
{
    fn call(&self, args: Vec<String>) -> HandlerFuture {
        Box::pin((self)(args))
    }
}

/// Dispatches named operations with positional, JSON-encoded arguments and
/// answers with a JSON [`Response`].
pub struct Router {
    pub routes: HashMap<String, Box<dyn Handler + 'static>>,
}

impl Router {
    pub fn new() -> Self {
        Router {
            routes: HashMap::new(),
        }
    }

    pub fn add(mut self, name: &str, handler: impl Handler + 'static) -> Self {
        self.routes.insert(name.to_string(), Box::new(handler));
        self
    }

    pub async fn call(&self, name: &str, args: Vec<String>) -> String {
        match self.routes.get(name) {
            Some(handler) => handler.call(args).await,
            None => {
                warn!("Operation {} is not implemented", name);
                not_implemented(name)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct Response<T> {
    pub result: Option<T>,
    pub error: Option<String>,
    pub is_success: bool,
}

const CATASTROPHIC_ERROR: &str = "{\"result\": null, \"error\": \"CATASTROPHIC_ERROR: Failed to serialize response\", \"is_success\": false}";
const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

impl<T: Serialize> Response<T> {
    pub fn success(result: T) -> Self {
        Response {
            result: Some(result),
            error: None,
            is_success: true,
        }
    }

    pub fn error(error: String) -> Self {
        Response {
            result: None,
            error: Some(error),
            is_success: false,
        }
    }

    /// A failed call that still carries a result, e.g. a status code.
    pub fn failure(result: T, error: String) -> Self {
        Response {
            result: Some(result),
            error: Some(error),
            is_success: false,
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or(CATASTROPHIC_ERROR.into())
    }
}

fn not_implemented(name: &str) -> String {
    Response::<()>::error(format!(
        "{}: {}",
        NOT_IMPLEMENTED,
        TransferError::UnknownOperation(name.to_string())
    ))
    .encode()
}

/// Decodes the JSON argument at `position`.
pub fn argument<T: DeserializeOwned>(args: &[String], position: usize) -> Result<T> {
    let raw = args.get(position).ok_or_else(|| {
        TransferError::InvalidArguments(format!("Missing argument at position {}", position))
    })?;
    serde_json::from_str::<T>(raw).map_err(|_| {
        TransferError::InvalidArguments(format!(
            "Failed to deserialize argument at position {}",
            position
        ))
    })
}

/// The `copy_files` and `pick_file` operations backed by `service`.
pub fn file_operations_router(service: Arc<TransferService>) -> Router {
    let copy_service = service.clone();
    let pick_service = service;

    Router::new()
        .add(COPY_FILES, move |args: Vec<String>| {
            let service = copy_service.clone();
            async move { copy_files(&service, args).await.encode() }
        })
        .add(PICK_FILE, move |_: Vec<String>| {
            let service = pick_service.clone();
            async move { pick_file(&service).await.encode() }
        })
}

async fn copy_files(service: &TransferService, args: Vec<String>) -> Response<i32> {
    let paths = argument::<String>(&args, 0)
        .and_then(|source| Ok((source, argument::<String>(&args, 1)?)));
    let (source, destination) = match paths {
        Ok(paths) => paths,
        Err(e) => return Response::failure(e.status_code(), e.to_string()),
    };

    match service.copy_files(&source, &destination).await {
        Ok(_) => Response::success(crate::errors::STATUS_SUCCESS),
        Err(e) => Response::failure(e.status_code(), e.to_string()),
    }
}

/// `pick_file` result: the picked document on success, the failure's status
/// code otherwise.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PickResult {
    Document(String),
    Status(i32),
}

async fn pick_file(service: &TransferService) -> Response<PickResult> {
    match service.request_pick().await {
        Ok(id) => Response::success(PickResult::Document(id.into())),
        Err(e) => Response::failure(PickResult::Status(e.status_code()), e.to_string()),
    }
}
