//! Per-endpoint invocation settings.
//!
//! Each compiler endpoint is a row of data: which tool, which flags, which
//! request fields become which workspace files, and which files come back.
//! The file names and flag sets are what `xml2st` and `iec2c` expect and must
//! not change.

use plcc_exec::{InputFile, InvocationRequest, InvocationResult, NamedOutput, OutputSpec};
use tracing::info;

use crate::config::{ToolConfig, ToolsConfig};
use crate::error::AppResult;
use crate::state::AppState;

use super::extract::JsonObject;

/// External tool used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Xml2St,
    Iec2C,
}

impl Tool {
    fn config(self, tools: &ToolsConfig) -> &ToolConfig {
        match self {
            Self::Xml2St => &tools.xml2st,
            Self::Iec2C => &tools.iec2c,
        }
    }
}

/// A request field written to the workspace as a file.
#[derive(Debug, Clone, Copy)]
pub struct InputField {
    pub field: &'static str,
    pub file_name: &'static str,
    /// Whether an empty string is accepted. Missing fields never are.
    pub allow_empty: bool,
}

/// Files returned by an endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Outputs {
    /// `(response key, file name)` pairs.
    Named(&'static [(&'static str, &'static str)]),
    /// Every file except the inputs.
    Enumerate,
}

/// Everything that distinguishes one compiler endpoint from another.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub tool: Tool,
    pub workspace_prefix: &'static str,
    pub args: &'static [&'static str],
    pub inputs: &'static [InputField],
    pub outputs: Outputs,
}

pub const GENERATE_ST: EndpointSpec = EndpointSpec {
    name: "generate-st",
    tool: Tool::Xml2St,
    workspace_prefix: "xml2st_",
    args: &["--generate-st", "plc.xml"],
    inputs: &[InputField {
        field: "plc_xml",
        file_name: "plc.xml",
        allow_empty: false,
    }],
    outputs: Outputs::Named(&[("program_st", "program.st")]),
};

pub const COMPILE_ST: EndpointSpec = EndpointSpec {
    name: "compile-st",
    tool: Tool::Iec2C,
    workspace_prefix: "iec2c_",
    args: &["-f", "-l", "-p", "-r", "-R", "-a", "program.st"],
    inputs: &[InputField {
        field: "program_st",
        file_name: "program.st",
        allow_empty: false,
    }],
    outputs: Outputs::Enumerate,
};

pub const GENERATE_DEBUG: EndpointSpec = EndpointSpec {
    name: "generate-debug",
    tool: Tool::Xml2St,
    workspace_prefix: "debug_",
    args: &["--generate-debug", "program.st", "VARIABLES.csv"],
    inputs: &[
        InputField {
            field: "program_st",
            file_name: "program.st",
            allow_empty: false,
        },
        InputField {
            field: "variables_csv",
            file_name: "VARIABLES.csv",
            allow_empty: false,
        },
    ],
    outputs: Outputs::Named(&[("program_st", "program.st"), ("debug_c", "debug.c")]),
};

pub const GENERATE_GLUEVARS: EndpointSpec = EndpointSpec {
    name: "generate-gluevars",
    tool: Tool::Xml2St,
    workspace_prefix: "gluevars_",
    args: &["--generate-gluevars", "LOCATED_VARIABLES.h"],
    inputs: &[InputField {
        field: "located_variables_h",
        file_name: "LOCATED_VARIABLES.h",
        allow_empty: true,
    }],
    outputs: Outputs::Named(&[("glue_vars_c", "glueVars.c")]),
};

impl EndpointSpec {
    /// Validate `body` and turn it into an invocation request.
    ///
    /// Fails with a validation error before anything touches the disk.
    pub fn build_request(
        &self,
        tools: &ToolsConfig,
        body: &JsonObject,
    ) -> AppResult<InvocationRequest> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| {
                body.text_field(input.field, input.allow_empty)
                    .map(|text| InputFile::text(input.file_name, text))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let tool = self.tool.config(tools);
        let outputs = match self.outputs {
            Outputs::Named(files) => OutputSpec::named(
                files
                    .iter()
                    .map(|(key, file_name)| NamedOutput::new(*key, *file_name)),
            ),
            Outputs::Enumerate => OutputSpec::enumerate(),
        };

        let mut request = InvocationRequest::new(&tool.path)
            .workspace_prefix(self.workspace_prefix)
            .args(tool.extra_args.iter().cloned())
            .args(self.args.iter().copied())
            .outputs(outputs);
        for input in inputs {
            request = request.input(input);
        }

        Ok(request)
    }
}

/// Validate the body and run the endpoint's tool.
pub async fn invoke(
    state: &AppState,
    spec: &EndpointSpec,
    body: &JsonObject,
) -> AppResult<InvocationResult> {
    let request = spec.build_request(&state.config.tools, body)?;
    let result = state.runner.run(request).await?;

    info!(
        endpoint = spec.name,
        exit_code = result.exit_code,
        timed_out = result.timed_out(),
        outputs = result.outputs.len(),
        "Tool invocation finished"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn body(value: serde_json::Value) -> JsonObject {
        match value {
            serde_json::Value::Object(map) => JsonObject(map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_generate_st_request() {
        let tools = ToolsConfig::default();
        let request = GENERATE_ST
            .build_request(&tools, &body(json!({ "plc_xml": "<project/>" })))
            .unwrap();

        assert_eq!(request.program, std::path::PathBuf::from("/usr/bin/xml2st"));
        assert_eq!(request.args, vec!["--generate-st", "plc.xml"]);
        assert_eq!(request.inputs, vec![InputFile::text("plc.xml", "<project/>")]);
        assert_eq!(request.workspace_prefix, "xml2st_");
        assert_eq!(
            request.outputs,
            OutputSpec::Named(vec![NamedOutput::new("program_st", "program.st")])
        );
    }

    #[test]
    fn test_compile_st_request_prepends_extra_args() {
        let mut tools = ToolsConfig::default();
        tools.iec2c.extra_args = vec!["-I".to_string(), "/usr/lib/iec".to_string()];
        let request = COMPILE_ST
            .build_request(&tools, &body(json!({ "program_st": "PROGRAM main" })))
            .unwrap();

        assert_eq!(request.program, std::path::PathBuf::from("/usr/bin/iec2c"));
        assert_eq!(
            request.args,
            vec!["-I", "/usr/lib/iec", "-f", "-l", "-p", "-r", "-R", "-a", "program.st"]
        );
        assert_eq!(request.outputs, OutputSpec::enumerate());
    }

    #[test]
    fn test_generate_debug_requires_both_fields() {
        let tools = ToolsConfig::default();
        let err = GENERATE_DEBUG
            .build_request(&tools, &body(json!({ "program_st": "PROGRAM main" })))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("'variables_csv'"));

        let request = GENERATE_DEBUG
            .build_request(
                &tools,
                &body(json!({ "program_st": "PROGRAM main", "variables_csv": "a;b" })),
            )
            .unwrap();
        assert_eq!(
            request
                .inputs
                .iter()
                .map(|input| input.name.as_str())
                .collect::<Vec<_>>(),
            vec!["program.st", "VARIABLES.csv"]
        );
    }

    #[test]
    fn test_generate_gluevars_accepts_empty_header() {
        let tools = ToolsConfig::default();
        let request = GENERATE_GLUEVARS
            .build_request(&tools, &body(json!({ "located_variables_h": "" })))
            .unwrap();
        assert_eq!(
            request.inputs,
            vec![InputFile::text("LOCATED_VARIABLES.h", "")]
        );
        assert_eq!(
            request.args,
            vec!["--generate-gluevars", "LOCATED_VARIABLES.h"]
        );
    }

    #[test]
    fn test_input_file_names_are_plain() {
        for spec in [GENERATE_ST, COMPILE_ST, GENERATE_DEBUG, GENERATE_GLUEVARS] {
            for input in spec.inputs {
                assert!(plcc_exec::validate_file_name(input.file_name).is_ok());
            }
        }
    }
}
