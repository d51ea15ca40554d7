//! Command implementations. Every command reads JSON and prints pretty JSON
//! to stdout, except query-string requests which print as a single line.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use capa_core::api::CapabilityClient;
use capa_core::config::ApiConfig;
use capa_core::models::capability::{Capability, HttpMethod};
use capa_core::schema::codec::{self, EditableParams};
use capa_core::schema::collector::{FormInput, collect};
use capa_core::schema::compiler::{self, Compiled};
use capa_core::schema::sample::default_inputs;
use capa_mcp::tools::call::prepare_call;
use capa_mcp::tools::capability_tools;

use crate::{Error, Result};

// =============================================================================
// Input / output
// =============================================================================

fn read_json(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(path)
            .map_err(|e| Error::Custom(format!("Cannot read {}: {e}", path.display())))?
    };
    Ok(serde_json::from_str(&text)?)
}

fn read_capability(path: &Path) -> Result<Capability> {
    Ok(serde_json::from_value(read_json(path)?)?)
}

fn read_object(path: Option<&PathBuf>) -> Result<Map<String, Value>> {
    let Some(path) = path else {
        return Ok(Map::new());
    };
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Custom(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

fn read_form_input(path: &Path) -> Result<FormInput> {
    Ok(serde_json::from_value(read_json(path)?)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Schema commands
// =============================================================================

pub fn decode(schema: &Path) -> Result<()> {
    print_json(&codec::decode(&read_json(schema)?))
}

pub fn encode(params: &Path) -> Result<()> {
    let params: EditableParams = serde_json::from_value(read_json(params)?)?;
    print_json(&codec::encode(&params)?)
}

// =============================================================================
// Capability commands
// =============================================================================

pub fn preview(capability: &Path, method: Option<HttpMethod>) -> Result<()> {
    let capability = read_capability(capability)?;
    let method = method.unwrap_or(capability.method);
    match compiler::preview(&capability.parameters(), method)? {
        Compiled::Query(query) if query.pairs.is_empty() => println!("{method} {}", capability.url),
        Compiled::Query(query) => println!("{method} {}?{query}", capability.url),
        Compiled::Body(body) => {
            println!("{method} {}", capability.url);
            print_json(&body)?;
        }
    }
    Ok(())
}

pub fn compile(capability: &Path, args: Option<&PathBuf>) -> Result<()> {
    let capability = read_capability(capability)?;
    let args = read_object(args)?;
    match capability.compile_call(&args)? {
        Compiled::Query(query) => println!("{}", query.encoded()),
        Compiled::Body(body) => print_json(&body)?,
    }
    Ok(())
}

pub fn collect_input(capability: &Path, input: &Path) -> Result<()> {
    let capability = read_capability(capability)?;
    let input = read_form_input(input)?;
    let params = collect(&capability.editable_params().llm_params_schema, &input)
        .into_result()
        .map_err(Error::Validation)?;
    print_json(&params)
}

pub fn defaults(capability: &Path) -> Result<()> {
    let capability = read_capability(capability)?;
    print_json(&default_inputs(&capability.editable_params().llm_params_schema))
}

pub fn tool(paths: &[PathBuf]) -> Result<()> {
    let capabilities = paths
        .iter()
        .map(|p| read_capability(p))
        .collect::<Result<Vec<_>>>()?;
    print_json(&capability_tools(&capabilities))
}

pub fn call(capability: &Path, args: Option<&PathBuf>) -> Result<()> {
    let capability = read_capability(capability)?;
    let args = match args {
        Some(path) => Some(read_json(path)?),
        None => None,
    };
    print_json(&prepare_call(&capability, args.as_ref())?)
}

// =============================================================================
// API commands
// =============================================================================

pub async fn test(
    id: &str,
    input: Option<&PathBuf>,
    api_url: Option<String>,
    token: Option<String>,
) -> Result<()> {
    let mut config = ApiConfig::from_env();
    if let Some(url) = api_url {
        config.base_url = url;
    }
    if token.is_some() {
        config.token = token;
    }

    let client = CapabilityClient::new(&config);
    let capability = client.get_capability(id).await?;
    let schema = capability.editable_params().llm_params_schema;

    let input = match input {
        Some(path) => read_form_input(path)?,
        None => default_inputs(&schema),
    };
    let params = collect(&schema, &input)
        .into_result()
        .map_err(Error::Validation)?;

    log::info!("Testing capability '{}' ({id})", capability.name);
    let response = client.test_capability(id, &params).await?;
    print_json(&response)?;

    if !response.success {
        let status = response
            .status_code
            .map(|s| format!(" with status {s}"))
            .unwrap_or_default();
        return Err(Error::Custom(format!("Capability test failed{status}")));
    }
    Ok(())
}
