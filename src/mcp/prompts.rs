//! Prompt templates exposed over MCP.
//!
//! Four prompts guide SQL work: `select_database` steers the assistant
//! toward picking a database ID via the tools, `sql_query` opens a
//! query-writing request, and `explain_query`/`optimize_query` wrap an
//! existing SQL statement for analysis. The latter two require a
//! `query` argument.

use rmcp::ErrorData as McpError;
use rmcp::model::{
    GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageContent,
    PromptMessageRole,
};
use serde_json::Value;

const SELECT_DATABASE: &str = "select_database";
const SQL_QUERY: &str = "sql_query";
const EXPLAIN_QUERY: &str = "explain_query";
const OPTIMIZE_QUERY: &str = "optimize_query";

const SELECT_DATABASE_DESC: &str = "Help user select which database to use";
const SQL_QUERY_DESC: &str = "Create an SQL query against the database";
const EXPLAIN_QUERY_DESC: &str = "Explain what a SQL query does";
const OPTIMIZE_QUERY_DESC: &str = "Optimize a SQL query for better performance";

/// All prompts advertised by the server, in listing order.
pub fn catalog() -> Vec<Prompt> {
    vec![
        Prompt::new(SELECT_DATABASE, Some(SELECT_DATABASE_DESC), None),
        Prompt::new(SQL_QUERY, Some(SQL_QUERY_DESC), None),
        Prompt::new(
            EXPLAIN_QUERY,
            Some(EXPLAIN_QUERY_DESC),
            Some(vec![query_argument("The SQL query to explain")]),
        ),
        Prompt::new(
            OPTIMIZE_QUERY,
            Some(OPTIMIZE_QUERY_DESC),
            Some(vec![query_argument("The SQL query to optimize")]),
        ),
    ]
}

/// Render a prompt by name, validating required arguments.
pub fn render(name: &str, arguments: Option<&JsonObject>) -> Result<GetPromptResult, McpError> {
    let (description, text) = match name {
        SELECT_DATABASE => (
            SELECT_DATABASE_DESC,
            "I need to determine which database to use for your query. \
             Please use the list_databases tool first, then tell me which \
             database ID to use."
                .to_string(),
        ),
        SQL_QUERY => (
            SQL_QUERY_DESC,
            "Please help me write a SQL query for the following question:\n\n".to_string(),
        ),
        EXPLAIN_QUERY => (
            EXPLAIN_QUERY_DESC,
            format!(
                "Can you explain what the following SQL query does?\n\n```sql\n{}\n```",
                required_query(arguments)?
            ),
        ),
        OPTIMIZE_QUERY => (
            OPTIMIZE_QUERY_DESC,
            format!(
                "Can you optimize the following SQL query for better performance?\n\n```sql\n{}\n```",
                required_query(arguments)?
            ),
        ),
        other => {
            return Err(McpError::invalid_params(
                format!("Unknown prompt: {other}"),
                None,
            ));
        }
    };

    Ok(GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage {
            role: PromptMessageRole::User,
            content: PromptMessageContent::text(text),
        }],
    })
}

fn query_argument(description: &str) -> PromptArgument {
    PromptArgument {
        name: "query".to_string(),
        title: None,
        description: Some(description.to_string()),
        required: Some(true),
    }
}

fn required_query(arguments: Option<&JsonObject>) -> Result<&str, McpError> {
    arguments
        .and_then(|args| args.get("query"))
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::invalid_params("Missing required argument: query", None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_text(result: &GetPromptResult) -> &str {
        match &result.messages[0].content {
            PromptMessageContent::Text { text, .. } => text,
            other => panic!("expected text content, got {other:?}"),
        }
    }

    fn query_args(sql: &str) -> JsonObject {
        let mut args = JsonObject::new();
        args.insert("query".to_string(), json!(sql));
        args
    }

    #[test]
    fn test_catalog_lists_four_prompts() {
        let prompts = catalog();
        let names: Vec<&str> = prompts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "select_database",
                "sql_query",
                "explain_query",
                "optimize_query"
            ]
        );
    }

    #[test]
    fn test_analysis_prompts_require_query_argument() {
        for prompt in catalog() {
            let expects_arg = matches!(prompt.name.as_str(), "explain_query" | "optimize_query");
            match prompt.arguments {
                Some(args) => {
                    assert!(expects_arg, "{} should not take arguments", prompt.name);
                    assert_eq!(args.len(), 1);
                    assert_eq!(args[0].name, "query");
                    assert_eq!(args[0].required, Some(true));
                }
                None => assert!(!expects_arg, "{} should take a query argument", prompt.name),
            }
        }
    }

    #[test]
    fn test_select_database_text() {
        let result = render("select_database", None).unwrap();
        assert_eq!(
            message_text(&result),
            "I need to determine which database to use for your query. \
             Please use the list_databases tool first, then tell me which \
             database ID to use."
        );
        assert!(matches!(result.messages[0].role, PromptMessageRole::User));
    }

    #[test]
    fn test_sql_query_text_ends_open() {
        let result = render("sql_query", None).unwrap();
        assert_eq!(
            message_text(&result),
            "Please help me write a SQL query for the following question:\n\n"
        );
    }

    #[test]
    fn test_explain_query_wraps_sql_in_fence() {
        let args = query_args("SELECT * FROM users");
        let result = render("explain_query", Some(&args)).unwrap();
        assert_eq!(
            message_text(&result),
            "Can you explain what the following SQL query does?\n\n```sql\nSELECT * FROM users\n```"
        );
    }

    #[test]
    fn test_optimize_query_wraps_sql_in_fence() {
        let args = query_args("SELECT 1");
        let result = render("optimize_query", Some(&args)).unwrap();
        assert_eq!(
            message_text(&result),
            "Can you optimize the following SQL query for better performance?\n\n```sql\nSELECT 1\n```"
        );
    }

    #[test]
    fn test_missing_query_argument_is_invalid_params() {
        let err = render("explain_query", None).unwrap_err();
        assert!(err.message.contains("Missing required argument: query"));

        let mut args = JsonObject::new();
        args.insert("query".to_string(), json!(42));
        let err = render("optimize_query", Some(&args)).unwrap_err();
        assert!(err.message.contains("Missing required argument: query"));
    }

    #[test]
    fn test_unknown_prompt_name_is_rejected() {
        let err = render("write_migration", None).unwrap_err();
        assert!(err.message.contains("Unknown prompt: write_migration"));
    }
}
