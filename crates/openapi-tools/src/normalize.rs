//! Path map -> endpoint descriptors.
//!
//! Each `paths[path][method]` operation becomes one descriptor:
//! - `{param}` path segments become `{{param}}` placeholders;
//! - query/header parameters with an `example`/`default` are sent literally, required ones become
//!   `{{name}}`, optional ones are left to caller overrides;
//! - the request body is picked by media type (JSON, url-encoded, multipart, in that order).

use crate::resolver::LocalRefResolver;
use postman_mcp_http_tools::endpoint::{BodySpec, EndpointDescriptor, HttpMethod};
use postman_mcp_http_tools::naming::IdentifierAllocator;
use postman_mcp_http_tools::template::value_to_string;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const OPERATION_KEYS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Headers that `OpenAPI` says are described elsewhere and must not be declared as parameters.
const IGNORED_HEADER_PARAMS: [&str; 3] = ["accept", "content-type", "authorization"];

const SCHEMA_DEPTH_LIMIT: usize = 8;

/// Flatten the `paths` object of `doc` in declaration order.
#[must_use]
pub fn normalize_paths(doc: &Value) -> Vec<EndpointDescriptor> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        warn!("Spec has no 'paths' object");
        return Vec::new();
    };

    let resolver = LocalRefResolver::new(doc);
    let mut alloc = IdentifierAllocator::new();
    let mut out = Vec::new();

    for (path, item) in paths {
        let item = match resolver.resolve(item) {
            Ok(Value::Object(item)) => item,
            Ok(_) => {
                warn!(path = %path, "Skipping path item that is not an object");
                continue;
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Skipping path item");
                continue;
            }
        };
        let shared_params = item.get("parameters");

        for key in OPERATION_KEYS {
            let Some(operation) = item.get(key) else {
                continue;
            };
            let Ok(method) = key.parse::<HttpMethod>() else {
                warn!(path = %path, method = key, "Skipping operation with unsupported method");
                continue;
            };
            let Some(operation) = operation.as_object() else {
                warn!(path = %path, method = key, "Skipping operation that is not an object");
                continue;
            };

            let op = Operation {
                resolver,
                path,
                method,
                operation,
                shared_params,
            };
            out.push(op.into_descriptor(&mut alloc));
        }
    }

    out
}

struct Operation<'a> {
    resolver: LocalRefResolver<'a>,
    path: &'a str,
    method: HttpMethod,
    operation: &'a Map<String, Value>,
    shared_params: Option<&'a Value>,
}

impl<'a> Operation<'a> {
    fn into_descriptor(self, alloc: &mut IdentifierAllocator) -> EndpointDescriptor {
        let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        let name_path: Vec<&str> = segments.iter().rev().take(2).rev().copied().collect();
        let identifier = alloc.allocate_endpoint(&name_path, self.method);

        let display_name = str_field(self.operation, "summary")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", self.method, self.path));
        let description = str_field(self.operation, "description")
            .or_else(|| str_field(self.operation, "summary"))
            .map(str::to_string);

        let params = self.parameters();
        let mut query = Vec::new();
        let mut headers = Vec::new();
        for param in &params {
            match param.location {
                "query" => query.extend(param.template()),
                "header" if !is_ignored_header(param.name) => headers.extend(param.template()),
                _ => {}
            }
        }

        let body = self
            .request_body()
            .or_else(|| self.swagger_body(&params))
            .unwrap_or_default();

        EndpointDescriptor {
            identifier,
            display_name,
            method: self.method,
            url_template: path_template(self.path),
            headers,
            query,
            body,
            description,
        }
    }

    /// Path-item parameters overlaid by operation parameters (same `in` + `name` wins).
    fn parameters(&self) -> Vec<Param<'a>> {
        let mut out: Vec<Param<'a>> = Vec::new();
        let lists = [self.shared_params, self.operation.get("parameters")];
        for list in lists.into_iter().flatten() {
            let Some(list) = list.as_array() else {
                continue;
            };
            for raw in list {
                let param = match self.resolver.resolve(raw) {
                    Ok(Value::Object(p)) => p,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(
                            path = %self.path,
                            method = %self.method,
                            error = %e,
                            "Skipping parameter"
                        );
                        continue;
                    }
                };
                let (Some(name), Some(location)) =
                    (str_field(param, "name"), str_field(param, "in"))
                else {
                    continue;
                };
                let parsed = Param {
                    name,
                    location,
                    required: param
                        .get("required")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    literal: literal_value(self.resolver, param),
                    raw: param,
                };
                match out
                    .iter_mut()
                    .find(|p| p.name == parsed.name && p.location == parsed.location)
                {
                    Some(existing) => *existing = parsed,
                    None => out.push(parsed),
                }
            }
        }
        out
    }

    fn request_body(&self) -> Option<BodySpec> {
        let raw = self.operation.get("requestBody")?;
        let body = match self.resolver.resolve(raw) {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    path = %self.path,
                    method = %self.method,
                    error = %e,
                    "Ignoring request body"
                );
                return None;
            }
        };
        let content = body.get("content")?.as_object()?;

        if let Some((_, media)) = content.iter().find(|(ct, _)| is_json_media_type(ct)) {
            return Some(BodySpec::Raw {
                content: json_body_template(self.resolver, media),
                mime_hint: Some("json".to_string()),
            });
        }
        if let Some(media) = content.get("application/x-www-form-urlencoded") {
            return Some(BodySpec::UrlEncoded(field_templates(self.resolver, media.get("schema"))));
        }
        if let Some(media) = content.get("multipart/form-data") {
            return Some(BodySpec::Multipart(field_templates(self.resolver, media.get("schema"))));
        }

        debug!(
            path = %self.path,
            method = %self.method,
            media_types = ?content.keys().collect::<Vec<_>>(),
            "no supported request body media type"
        );
        None
    }

    /// Swagger 2.0 `in: body` / `in: formData` parameters.
    fn swagger_body(&self, params: &[Param<'a>]) -> Option<BodySpec> {
        if let Some(body) = params.iter().find(|p| p.location == "body") {
            let schema = body.raw.get("schema");
            let content = schema_example(self.resolver, schema)
                .map(|v| v.to_string())
                .unwrap_or_else(|| placeholder_object(self.resolver, schema));
            return Some(BodySpec::Raw {
                content,
                mime_hint: Some("json".to_string()),
            });
        }

        let fields: Vec<(String, String)> = params
            .iter()
            .filter(|p| p.location == "formData")
            .map(|p| (p.name.to_string(), placeholder(p.name)))
            .collect();
        if fields.is_empty() {
            return None;
        }
        let multipart = self
            .operation
            .get("consumes")
            .and_then(Value::as_array)
            .is_some_and(|c| c.iter().any(|v| v.as_str() == Some("multipart/form-data")));
        Some(if multipart {
            BodySpec::Multipart(fields)
        } else {
            BodySpec::UrlEncoded(fields)
        })
    }
}

struct Param<'a> {
    name: &'a str,
    location: &'a str,
    required: bool,
    literal: Option<String>,
    raw: &'a Map<String, Value>,
}

impl Param<'_> {
    fn template(&self) -> Option<(String, String)> {
        match (&self.literal, self.required) {
            (Some(literal), _) => Some((self.name.to_string(), literal.clone())),
            (None, true) => Some((self.name.to_string(), placeholder(self.name))),
            (None, false) => None,
        }
    }
}

/// `example`, else `schema.example`, else `schema.default`, coerced to a string.
fn literal_value(resolver: LocalRefResolver<'_>, param: &Map<String, Value>) -> Option<String> {
    if let Some(example) = param.get("example").filter(|v| is_scalar(v)) {
        return Some(value_to_string(example));
    }
    let schema = param
        .get("schema")
        .and_then(|s| resolver.resolve(s).ok())
        .unwrap_or(&Value::Null);
    ["example", "default"]
        .into_iter()
        .filter_map(|k| schema.get(k).or_else(|| param.get(k)))
        .find(|v| is_scalar(v))
        .map(value_to_string)
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn json_body_template(resolver: LocalRefResolver<'_>, media: &Value) -> String {
    if let Some(example) = media.get("example") {
        return example.to_string();
    }
    if let Some(first) = media
        .get("examples")
        .and_then(Value::as_object)
        .and_then(|examples| examples.values().next())
        .and_then(|ex| resolver.resolve(ex).ok())
        .and_then(|ex| ex.get("value"))
    {
        return first.to_string();
    }
    let schema = media.get("schema");
    schema_example(resolver, schema)
        .map(|v| v.to_string())
        .unwrap_or_else(|| placeholder_object(resolver, schema))
}

fn schema_example<'a>(
    resolver: LocalRefResolver<'a>,
    schema: Option<&'a Value>,
) -> Option<&'a Value> {
    let schema = resolver.resolve(schema?).ok()?;
    schema.get("example")
}

/// `{"prop":"{{prop}}", ...}` for the top-level properties, `{}` when there are none.
fn placeholder_object(resolver: LocalRefResolver<'_>, schema: Option<&Value>) -> String {
    let mut obj = Map::new();
    for name in schema_properties(resolver, schema, 0) {
        obj.insert(name.clone(), Value::String(placeholder(&name)));
    }
    Value::Object(obj).to_string()
}

fn field_templates(
    resolver: LocalRefResolver<'_>,
    schema: Option<&Value>,
) -> Vec<(String, String)> {
    schema_properties(resolver, schema, 0)
        .into_iter()
        .map(|name| {
            let value = placeholder(&name);
            (name, value)
        })
        .collect()
}

/// Property names of an object schema, following `$ref` and `allOf`.
fn schema_properties(
    resolver: LocalRefResolver<'_>,
    schema: Option<&Value>,
    depth: usize,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if depth > SCHEMA_DEPTH_LIMIT {
        return out;
    }
    let Some(schema) = schema.and_then(|s| resolver.resolve(s).ok()) else {
        return out;
    };

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        out.extend(props.keys().cloned());
    }
    if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
        for part in all_of {
            for name in schema_properties(resolver, Some(part), depth + 1) {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
    }
    out
}

fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn is_ignored_header(name: &str) -> bool {
    IGNORED_HEADER_PARAMS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// `/users/{id}` -> `/users/{{id}}`.
fn path_template(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 8);
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        out.push_str(&rest[..open]);
        let name = rest[open + 1..close].trim();
        out.push_str(&placeholder(name));
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
