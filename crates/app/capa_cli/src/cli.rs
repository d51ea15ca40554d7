use std::path::PathBuf;

use clap::{Parser, Subcommand};

use capa_core::models::capability::HttpMethod;

#[derive(Parser, Debug)]
#[command(name = "capa", version, about = "Edit, preview and test capability parameter schemas")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// File arguments accept `-` for stdin.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a stored schema into fixed params and the LLM schema
    Decode {
        #[arg(default_value = "-")]
        schema: PathBuf,
    },

    /// Merge fixed params and the LLM schema back into a stored schema
    Encode {
        #[arg(default_value = "-")]
        params: PathBuf,
    },

    /// Show the request a capability would send, with placeholders
    Preview {
        #[arg(default_value = "-")]
        capability: PathBuf,

        /// Override the capability's HTTP method
        #[arg(long)]
        method: Option<HttpMethod>,
    },

    /// Compile the request for concrete LLM arguments
    Compile {
        capability: PathBuf,

        /// JSON object of LLM arguments
        #[arg(long)]
        args: Option<PathBuf>,
    },

    /// Validate raw test-form input and print the typed params
    Collect {
        capability: PathBuf,

        /// JSON object of form values (strings or booleans)
        #[arg(long)]
        input: PathBuf,
    },

    /// Print the initial test-form values for a capability
    Defaults {
        #[arg(default_value = "-")]
        capability: PathBuf,
    },

    /// Print MCP tool definitions for one or more capabilities
    Tool {
        #[arg(required = true)]
        capabilities: Vec<PathBuf>,
    },

    /// Prepare an LLM tool call: check arguments and build the request
    Call {
        capability: PathBuf,

        /// JSON object of tool-call arguments
        #[arg(long)]
        args: Option<PathBuf>,
    },

    /// Run a capability through the test endpoint of the capability API
    Test {
        /// Capability id
        id: String,

        /// JSON object of form values (strings or booleans)
        #[arg(long)]
        input: Option<PathBuf>,

        /// API base URL (overrides CAPA_API_URL)
        #[arg(long)]
        api_url: Option<String>,

        /// Bearer token (overrides CAPA_API_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },

    /// Print version information
    Version,
}
