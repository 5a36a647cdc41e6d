// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, mode = $mode:expr) => {
        tracing::debug!(
            operation = $operation,
            mode = ?$mode,
            "API operation started"
        );
    };
    ($operation:expr, language = $language:expr) => {
        tracing::debug!(
            operation = $operation,
            language = %$language,
            "API operation started"
        );
    };
    ($operation:expr, message_count = $count:expr) => {
        tracing::debug!(
            operation = $operation,
            message_count = $count,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, card_count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            card_count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, mode = $mode:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            mode = ?$mode,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, mode = $mode:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            mode = ?$mode,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, mode = $mode:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            mode = ?$mode,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// LLM Pipeline Logging Macros
// ============================================================================

/// Log LLM pipeline operations with provider context
#[macro_export]
macro_rules! log_llm_operation {
    (start, $task:expr, provider = $provider:expr) => {
        tracing::info!(
            component = "llm_service",
            task = $task,
            provider = %$provider,
            "LLM operation started"
        );
    };
    (success, $task:expr, provider = $provider:expr, card_count = $count:expr) => {
        tracing::info!(
            component = "llm_service",
            task = $task,
            provider = %$provider,
            card_count = $count,
            "LLM operation completed successfully"
        );
    };
    (fallback, $task:expr, error = $error:expr) => {
        tracing::warn!(
            component = "llm_service",
            task = $task,
            error = %$error,
            "LLM completion rejected, applying fallback policy"
        );
    };
    (error, $task:expr, provider = $provider:expr, error = $error:expr) => {
        tracing::error!(
            component = "llm_service",
            task = $task,
            provider = %$provider,
            error = %$error,
            "LLM operation failed"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::models::GenerationMode;

    #[test]
    fn test_logging_macros_compile() {
        let mode = GenerationMode::Auto;
        let error = anyhow::anyhow!("test error");

        // Test that all macro variants compile successfully
        log_api_start!("generate_from_pdf", mode = mode);
        log_api_start!("synthesize", language = "en-US");
        log_api_start!("evaluate", message_count = 4);
        log_api_start!("validate_token");

        log_api_success!("generate_from_pdf", card_count = 5, "deck generated");
        log_api_success!("edit_deck", mode = mode, "deck updated");
        log_api_success!("validate_token", "token accepted");

        log_api_error!("generate_from_pdf", error = error, "generation failed");

        log_api_warn!("edit_deck", mode = mode, "no stored deck");
        log_api_warn!("transcribe", "empty transcription result");

        log_llm_operation!(start, "generate_from_topic", provider = "Gemini");
        log_llm_operation!(
            success,
            "generate_from_topic",
            provider = "Gemini",
            card_count = 10
        );
        log_llm_operation!(fallback, "edit", error = anyhow::anyhow!("wrong count"));

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "api_request", "request validated");
    }
}
