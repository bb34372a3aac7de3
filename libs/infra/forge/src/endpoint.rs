// [libs/infra/forge/src/endpoint.rs]
/*!
 * =================================================================
 * APARATO: TYPED ENDPOINT DESCRIPTOR
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: DESCRIPCIÓN DECLARATIVA DE PETICIONES AL FORGE
 *
 * VISION:
 * 1. TEMPLATE + ARGS: La ruta se declara como plantilla con huecos
 *    '{}' y argumentos posicionales; la clave del caché ETag es la
 *    ruta ya materializada.
 * 2. BODY OPAQUE: El cuerpo viaja como JSON ya serializado; el
 *    descriptor no conoce los DTOs del dominio.
 * =================================================================
 */

use serde_json::Value;

/// Verbos HTTP que el Forge consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Descriptor tipado de una petición al Forge.
#[derive(Debug, Clone)]
pub struct ForgeEndpoint {
    pub method: HttpMethod,
    /// Plantilla de ruta con huecos posicionales `{}` (sin host).
    pub path_template: &'static str,
    /// Argumentos que materializan la plantilla, en orden.
    pub path_args: Vec<String>,
    /// Cuerpo JSON opcional.
    pub body: Option<Value>,
    /// Activa el GET condicional con If-None-Match para esta ruta.
    pub use_etag: bool,
}

impl ForgeEndpoint {
    pub fn get(path_template: &'static str, path_args: Vec<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path_template,
            path_args,
            body: None,
            use_etag: false,
        }
    }

    pub fn post(path_template: &'static str, path_args: Vec<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path_template,
            path_args,
            body: Some(body),
            use_etag: false,
        }
    }

    pub fn put(path_template: &'static str, path_args: Vec<String>, body: Option<Value>) -> Self {
        Self {
            method: HttpMethod::Put,
            path_template,
            path_args,
            body,
            use_etag: false,
        }
    }

    /// Marca el descriptor para GET condicional (ETag / 304).
    pub fn with_etag(mut self) -> Self {
        self.use_etag = true;
        self
    }

    /// Materializa la plantilla sustituyendo cada hueco `{}` en orden.
    ///
    /// La ruta resultante es también la clave del caché ETag y del
    /// observatorio de rate-limit.
    pub fn materialized_path(&self) -> String {
        let mut materialized = String::with_capacity(self.path_template.len() + 16);
        let mut argument_cursor = self.path_args.iter();
        let mut remaining = self.path_template;

        while let Some(hole_index) = remaining.find("{}") {
            materialized.push_str(&remaining[..hole_index]);
            if let Some(argument) = argument_cursor.next() {
                materialized.push_str(argument);
            }
            remaining = &remaining[hole_index + 2..];
        }
        materialized.push_str(remaining);
        materialized
    }
}
