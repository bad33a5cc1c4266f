//! Service-worker side: the offline cache manager over the browser Cache API.

use std::rc::Rc;

use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};
use offline::{
    CacheConfig, CacheStorage, GenerationId, Network, NetworkError, OfflineCache, Request,
    RequestKey, RequestMode, Response, ResponseKind, StorageError,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};

fn storage_err(err: JsValue) -> StorageError {
    StorageError::Io(format!("{err:?}"))
}

async fn read_response(resp: web_sys::Response) -> Result<Response, String> {
    let status = StatusCode::from_u16(resp.status()).map_err(|e| e.to_string())?;
    let kind = match resp.type_() {
        web_sys::ResponseType::Basic => ResponseKind::Basic,
        web_sys::ResponseType::Cors => ResponseKind::Cors,
        web_sys::ResponseType::Error => ResponseKind::Error,
        web_sys::ResponseType::Opaque => ResponseKind::Opaque,
        web_sys::ResponseType::Opaqueredirect => ResponseKind::OpaqueRedirect,
        _ => ResponseKind::Default,
    };
    let content_type = resp.headers().get("content-type").ok().flatten();
    let buffer = JsFuture::from(resp.array_buffer().map_err(|e| format!("{e:?}"))?)
        .await
        .map_err(|e| format!("{e:?}"))?;
    let body = js_sys::Uint8Array::new(&buffer).to_vec();

    let mut out = Response::new(status, kind, body);
    out.content_type = content_type;
    Ok(out)
}

fn write_response(resp: &Response) -> Result<web_sys::Response, JsValue> {
    let init = web_sys::ResponseInit::new();
    init.set_status(resp.status.as_u16());
    let headers = web_sys::Headers::new()?;
    if let Some(content_type) = &resp.content_type {
        headers.set("content-type", content_type)?;
    }
    init.set_headers(&headers);
    let body = js_sys::Uint8Array::from(resp.body.as_ref());
    web_sys::Response::new_with_opt_buffer_source_and_init(Some(&*body), &init)
}

/// Cache generations are Cache API caches named after the generation id.
pub struct BrowserCacheStorage {
    caches: web_sys::CacheStorage,
}

impl BrowserCacheStorage {
    async fn open(&self, generation: &GenerationId) -> Result<web_sys::Cache, StorageError> {
        let cache = JsFuture::from(self.caches.open(generation.as_str()))
            .await
            .map_err(storage_err)?;
        cache.dyn_into().map_err(storage_err)
    }
}

impl CacheStorage for BrowserCacheStorage {
    async fn generations(&self) -> Result<Vec<GenerationId>, StorageError> {
        let keys = JsFuture::from(self.caches.keys()).await.map_err(storage_err)?;
        let keys: js_sys::Array = keys.dyn_into().map_err(storage_err)?;
        Ok(keys
            .iter()
            .filter_map(|k| k.as_string())
            .map(GenerationId)
            .collect())
    }

    async fn get(
        &self,
        generation: &GenerationId,
        key: &RequestKey,
    ) -> Result<Option<Response>, StorageError> {
        let cache = self.open(generation).await?;
        let found = JsFuture::from(cache.match_with_str(key.as_str()))
            .await
            .map_err(storage_err)?;
        if found.is_undefined() || found.is_null() {
            return Ok(None);
        }
        let resp: web_sys::Response = found.dyn_into().map_err(storage_err)?;
        read_response(resp).await.map(Some).map_err(StorageError::Io)
    }

    async fn put(
        &self,
        generation: &GenerationId,
        key: RequestKey,
        response: Response,
    ) -> Result<(), StorageError> {
        let cache = self.open(generation).await?;
        let resp = write_response(&response).map_err(storage_err)?;
        JsFuture::from(cache.put_with_str(key.as_str(), &resp))
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn put_all(
        &self,
        generation: &GenerationId,
        entries: Vec<(RequestKey, Response)>,
    ) -> Result<(), StorageError> {
        // The Cache API has no transactions; roll back by dropping the
        // generation, which install only ever writes fresh.
        for (key, response) in entries {
            if let Err(err) = self.put(generation, key, response).await {
                let _ = self.delete_generation(generation).await;
                return Err(err);
            }
        }
        Ok(())
    }

    async fn delete_generation(&self, generation: &GenerationId) -> Result<bool, StorageError> {
        let deleted = JsFuture::from(self.caches.delete(generation.as_str()))
            .await
            .map_err(storage_err)?;
        Ok(deleted.as_bool().unwrap_or(false))
    }
}

pub struct BrowserNetwork {
    scope: web_sys::ServiceWorkerGlobalScope,
}

impl Network for BrowserNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let init = web_sys::RequestInit::new();
        init.set_method(request.method.as_str());
        let headers = web_sys::Headers::new().map_err(|e| NetworkError::Failed(format!("{e:?}")))?;
        for (name, value) in &request.headers {
            if let Ok(value) = value.to_str() {
                headers
                    .append(name.as_str(), value)
                    .map_err(|e| NetworkError::Failed(format!("{e:?}")))?;
            }
        }
        init.set_headers(&headers);
        let outbound = web_sys::Request::new_with_str_and_init(&request.url, &init)
            .map_err(|e| NetworkError::Failed(format!("{e:?}")))?;
        // `fetch` rejects only when the network is unreachable.
        let resp = JsFuture::from(self.scope.fetch_with_request(&outbound))
            .await
            .map_err(|_| NetworkError::Offline)?;
        let resp: web_sys::Response = resp
            .dyn_into()
            .map_err(|e| NetworkError::Failed(format!("{e:?}")))?;
        read_response(resp).await.map_err(NetworkError::Failed)
    }
}

type BrowserCache = OfflineCache<BrowserCacheStorage, BrowserNetwork>;

fn to_request(req: &web_sys::Request) -> Request {
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or(Method::GET);
    let mode = match req.mode() {
        web_sys::RequestMode::Navigate => RequestMode::Navigate,
        web_sys::RequestMode::SameOrigin => RequestMode::SameOrigin,
        web_sys::RequestMode::NoCors => RequestMode::NoCors,
        _ => RequestMode::Cors,
    };
    let mut out = Request::new(method, req.url(), mode);
    if let Ok(Some(entries)) = js_sys::try_iter(&req.headers()) {
        for entry in entries.flatten() {
            let pair: js_sys::Array = entry.unchecked_into();
            let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) else {
                continue;
            };
            if let (Ok(name), Ok(value)) =
                (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value))
            {
                out.headers.append(name, value);
            }
        }
    }
    out
}

/// The worker instance the service-worker script drives.
#[wasm_bindgen]
pub struct OfflineWorker {
    cache: Rc<BrowserCache>,
}

#[wasm_bindgen]
impl OfflineWorker {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<OfflineWorker, JsValue> {
        crate::log::init("info");
        let config = match config_json.as_deref().map(CacheConfig::from_json) {
            Some(Ok(config)) => config,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "invalid cache config; using defaults");
                CacheConfig::default()
            }
            None => CacheConfig::default(),
        };
        let scope: web_sys::ServiceWorkerGlobalScope = js_sys::global().dyn_into()?;
        let caches = scope.caches()?;
        Ok(Self {
            cache: Rc::new(OfflineCache::new(
                config,
                BrowserCacheStorage { caches },
                BrowserNetwork { scope },
            )),
        })
    }

    pub fn install(&self) -> js_sys::Promise {
        let cache = Rc::clone(&self.cache);
        future_to_promise(async move {
            cache
                .install()
                .await
                .map(|()| JsValue::UNDEFINED)
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    pub fn activate(&self) -> js_sys::Promise {
        let cache = Rc::clone(&self.cache);
        future_to_promise(async move {
            let removed = cache
                .activate()
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            Ok(JsValue::from(removed.len() as u32))
        })
    }

    /// A newer worker took over.
    pub fn retire(&self) {
        self.cache.mark_redundant();
    }

    pub fn handle(&self, request: web_sys::Request) -> js_sys::Promise {
        let cache = Rc::clone(&self.cache);
        let request = to_request(&request);
        future_to_promise(async move {
            let served = cache
                .handle(&request)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            if let Some(task) = served.revalidation {
                let cache = Rc::clone(&cache);
                spawn_local(async move {
                    let outcome = task.run(&*cache).await;
                    tracing::debug!(?outcome, "revalidation finished");
                });
            }
            write_response(&served.response).map(JsValue::from)
        })
    }
}
