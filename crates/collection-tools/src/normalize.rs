//! Depth-first flattening of collection items into endpoint descriptors.
//!
//! Every shape check is explicit: an item that does not look like what we expect is skipped (with
//! a warning) instead of failing the whole document.

use postman_mcp_http_tools::endpoint::{BodySpec, EndpointDescriptor, HttpMethod};
use postman_mcp_http_tools::naming::IdentifierAllocator;
use postman_mcp_http_tools::template::value_to_string;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const DEFAULT_ITEM_NAME: &str = "item";

/// Flatten `items` (the collection's top-level `item` array) in declaration order.
///
/// Identifiers are unique across the returned list.
#[must_use]
pub fn normalize_items(items: &[Value]) -> Vec<EndpointDescriptor> {
    let mut alloc = IdentifierAllocator::new();
    let mut out = Vec::new();
    walk(items, &[], &mut alloc, &mut out);
    out
}

fn walk(
    items: &[Value],
    ancestors: &[String],
    alloc: &mut IdentifierAllocator,
    out: &mut Vec<EndpointDescriptor>,
) {
    for item in items {
        let Some(obj) = item.as_object() else {
            warn!(path = %ancestors.join(" / "), "Skipping collection item that is not an object");
            continue;
        };

        let name = non_empty_str(obj, "name").unwrap_or(DEFAULT_ITEM_NAME);
        let mut names = ancestors.to_vec();
        names.push(name.to_string());

        if let Some(request) = obj.get("request")
            && let Some(endpoint) = endpoint_from_request(request, obj, &names, alloc)
        {
            out.push(endpoint);
        }

        if let Some(children) = obj.get("item").and_then(Value::as_array) {
            walk(children, &names, alloc, out);
        }
    }
}

fn endpoint_from_request(
    request: &Value,
    item: &Map<String, Value>,
    names: &[String],
    alloc: &mut IdentifierAllocator,
) -> Option<EndpointDescriptor> {
    let display_name = names.join(" / ");

    // A bare string request is a GET to that URL.
    if let Some(url) = request.as_str() {
        let identifier = alloc.allocate_endpoint(names, HttpMethod::Get);
        return Some(EndpointDescriptor {
            identifier,
            display_name,
            method: HttpMethod::Get,
            url_template: url.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            body: BodySpec::None,
            description: description(item.get("description")),
        });
    }

    let Some(req) = request.as_object() else {
        warn!(endpoint = %display_name, "Skipping request that is neither a string nor an object");
        return None;
    };

    let method = match non_empty_str(req, "method") {
        None => HttpMethod::Get,
        Some(m) => match m.parse::<HttpMethod>() {
            Ok(method) => method,
            Err(e) => {
                warn!(endpoint = %display_name, error = %e, "Skipping request");
                return None;
            }
        },
    };

    let (url_template, query) = match req.get("url") {
        Some(Value::String(s)) => (s.clone(), Vec::new()),
        Some(Value::Object(url)) => (url_from_object(url), key_value_entries(url.get("query"))),
        Some(_) | None => {
            debug!(endpoint = %display_name, "request has no usable url");
            (String::new(), Vec::new())
        }
    };

    let identifier = alloc.allocate_endpoint(names, method);
    Some(EndpointDescriptor {
        identifier,
        display_name,
        method,
        url_template,
        headers: key_value_entries(req.get("header")),
        query,
        body: body_spec(req.get("body")),
        description: description(req.get("description"))
            .or_else(|| description(item.get("description"))),
    })
}

/// `raw` when present, else `protocol://host.joined:port/path/joined`.
fn url_from_object(url: &Map<String, Value>) -> String {
    if let Some(raw) = non_empty_str(url, "raw") {
        return raw.to_string();
    }

    let protocol = non_empty_str(url, "protocol")
        .map(|p| format!("{p}://"))
        .unwrap_or_default();
    let host = match url.get("host") {
        Some(Value::Array(parts)) => join_strings(parts, "."),
        Some(Value::String(h)) => h.clone(),
        _ => String::new(),
    };
    let port = url
        .get("port")
        .filter(|p| !p.is_null())
        .map(value_to_string)
        .filter(|p| !p.is_empty())
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let path = match url.get("path") {
        Some(Value::Array(parts)) => format!("/{}", join_strings(parts, "/")),
        Some(Value::String(p)) if !p.is_empty() => {
            if p.starts_with('/') {
                p.clone()
            } else {
                format!("/{p}")
            }
        }
        _ => String::new(),
    };

    format!("{protocol}{host}{port}{path}")
}

fn join_strings(parts: &[Value], sep: &str) -> String {
    parts
        .iter()
        .map(|p| match p {
            // Path segments may be `{ "value": ... }` objects for variables.
            Value::Object(o) => o.get("value").map(value_to_string).unwrap_or_default(),
            other => value_to_string(other),
        })
        .collect::<Vec<_>>()
        .join(sep)
}

fn body_spec(body: Option<&Value>) -> BodySpec {
    let Some(body) = body.and_then(Value::as_object) else {
        return BodySpec::None;
    };
    if body.get("disabled").and_then(Value::as_bool) == Some(true) {
        return BodySpec::None;
    }

    match body.get("mode").and_then(Value::as_str) {
        Some("raw") => BodySpec::Raw {
            content: body.get("raw").map(value_to_string).unwrap_or_default(),
            mime_hint: body
                .get("options")
                .and_then(|o| o.get("raw"))
                .and_then(|r| r.get("language"))
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        Some("urlencoded") => BodySpec::UrlEncoded(key_value_entries(body.get("urlencoded"))),
        Some("formdata") => BodySpec::Multipart(key_value_entries(body.get("formdata"))),
        Some(other) => {
            debug!(mode = other, "unsupported body mode; sending no body");
            BodySpec::None
        }
        None => BodySpec::None,
    }
}

/// Enabled `{ key, value }` entries, in order. Entries without a key are dropped.
fn key_value_entries(entries: Option<&Value>) -> Vec<(String, String)> {
    let Some(entries) = entries.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .filter(|e| e.get("disabled").and_then(Value::as_bool) != Some(true))
        .filter_map(|e| {
            let key = non_empty_str(e, "key")?;
            let value = e.get("value").map(value_to_string).unwrap_or_default();
            Some((key.to_string(), value))
        })
        .collect()
}

fn description(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.as_str(),
        Value::Object(o) => o.get("content").and_then(Value::as_str)?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn items(v: Value) -> Vec<Value> {
        v.as_array().cloned().unwrap_or_default()
    }

    #[test]
    fn nested_folders_flatten_depth_first() {
        let items = items(json!([
            {
                "name": "Auth",
                "item": [
                    {
                        "name": "Login",
                        "request": {
                            "method": "POST",
                            "url": "{{baseUrl}}/login",
                            "body": {
                                "mode": "raw",
                                "raw": "{\"user\":\"{{user}}\"}",
                                "options": {"raw": {"language": "json"}}
                            }
                        }
                    }
                ]
            },
            {"name": "Health", "request": "{{baseUrl}}/health"}
        ]));

        let endpoints = normalize_items(&items);
        assert_eq!(endpoints.len(), 2);

        let login = &endpoints[0];
        assert_eq!(login.identifier, "login_post");
        assert_eq!(login.display_name, "Auth / Login");
        assert_eq!(login.method, HttpMethod::Post);
        assert_eq!(login.url_template, "{{baseUrl}}/login");
        assert_eq!(
            login.body,
            BodySpec::Raw {
                content: "{\"user\":\"{{user}}\"}".to_string(),
                mime_hint: Some("json".to_string()),
            }
        );

        let health = &endpoints[1];
        assert_eq!(health.identifier, "health_get");
        assert_eq!(health.method, HttpMethod::Get);
    }

    #[test]
    fn url_object_is_assembled_without_raw() {
        let items = items(json!([{
            "name": "Get user",
            "request": {
                "method": "get",
                "url": {
                    "protocol": "https",
                    "host": ["api", "example", "com"],
                    "port": "8443",
                    "path": ["users", ":id"],
                    "query": [
                        {"key": "expand", "value": "true"},
                        {"key": "debug", "value": "1", "disabled": true},
                        {"value": "keyless"}
                    ]
                }
            }
        }]));
        let endpoints = normalize_items(&items);
        assert_eq!(
            endpoints[0].url_template,
            "https://api.example.com:8443/users/:id"
        );
        assert_eq!(
            endpoints[0].query,
            vec![("expand".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn raw_url_wins_over_parts() {
        let items = items(json!([{
            "name": "x",
            "request": {"url": {"raw": "{{baseUrl}}/x?y=1", "host": ["ignored"]}}
        }]));
        assert_eq!(normalize_items(&items)[0].url_template, "{{baseUrl}}/x?y=1");
    }

    #[test]
    fn disabled_headers_and_form_fields_are_excluded() {
        let items = items(json!([{
            "name": "Upload",
            "request": {
                "method": "POST",
                "url": "https://api.test/upload",
                "header": [
                    {"key": "X-On", "value": "1"},
                    {"key": "X-Off", "value": "0", "disabled": true},
                    {"key": "", "value": "blank"}
                ],
                "body": {
                    "mode": "formdata",
                    "formdata": [
                        {"key": "file", "value": "{{name}}", "type": "text"},
                        {"key": "skip", "value": "x", "disabled": true}
                    ]
                }
            }
        }, {
            "name": "Token",
            "request": {
                "method": "POST",
                "url": "https://api.test/token",
                "body": {
                    "mode": "urlencoded",
                    "urlencoded": [{"key": "grant_type", "value": "password"}]
                }
            }
        }]));
        let endpoints = normalize_items(&items);
        assert_eq!(
            endpoints[0].headers,
            vec![("X-On".to_string(), "1".to_string())]
        );
        assert_eq!(
            endpoints[0].body,
            BodySpec::Multipart(vec![("file".to_string(), "{{name}}".to_string())])
        );
        assert_eq!(
            endpoints[1].body,
            BodySpec::UrlEncoded(vec![("grant_type".to_string(), "password".to_string())])
        );
    }

    #[test]
    fn malformed_items_are_skipped_not_fatal() {
        let items = items(json!([
            "garbage",
            42,
            {"name": "Bad method", "request": {"method": "PROPFIND", "url": "https://x"}},
            {"name": "Bad request", "request": 7},
            {"name": "Folder without requests", "item": []},
            {"request": {"url": "https://api.test/anon"}},
            {"name": "Ok", "request": {"method": "DELETE", "url": "https://api.test/ok"}}
        ]));
        let endpoints = normalize_items(&items);
        let ids: Vec<&str> = endpoints.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["item_get", "ok_delete"]);
    }

    #[test]
    fn same_names_get_distinct_identifiers_in_declaration_order() {
        let items = items(json!([
            {"name": "A", "item": [{"name": "List", "request": {"method": "GET", "url": "/a"}}]},
            {"name": "B", "item": [{"name": "List", "request": {"method": "GET", "url": "/b"}}]},
            {"name": "C", "item": [{"name": "List", "request": {"method": "GET", "url": "/c"}}]},
            {"name": "C", "item": [{"name": "List", "request": {"method": "GET", "url": "/d"}}]}
        ]));
        let endpoints = normalize_items(&items);
        let ids: Vec<&str> = endpoints.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["list_get", "list", "c_list_get", "list_get_2"]);
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn descriptions_prefer_request_then_item() {
        let items = items(json!([
            {
                "name": "a",
                "description": "item level",
                "request": {"url": "/a", "description": {"content": " request level "}}
            },
            {"name": "b", "description": "item level", "request": {"url": "/b"}},
            {"name": "c", "request": {"url": "/c", "description": ""}}
        ]));
        let endpoints = normalize_items(&items);
        assert_eq!(endpoints[0].description.as_deref(), Some("request level"));
        assert_eq!(endpoints[1].description.as_deref(), Some("item level"));
        assert_eq!(endpoints[2].description, None);
    }

    #[test]
    fn unsupported_body_modes_send_nothing() {
        let items = items(json!([{
            "name": "gql",
            "request": {
                "method": "POST",
                "url": "/graphql",
                "body": {"mode": "graphql", "graphql": {"query": "{ me }"}}
            }
        }]));
        assert!(normalize_items(&items)[0].body.is_none());
    }
}
