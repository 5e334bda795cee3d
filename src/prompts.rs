//! Prompt text for LLM-based code conversion.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the conversion instructions
//!    requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt without
//!    calling a real model, making prompt regressions easy to catch.
//!
//! Callers can override the system prompt via
//! [`crate::config::ConversionConfig::system_prompt`]; the constants here
//! are used when no override is provided.

/// System message sent with every completion request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert code conversion engineer.";

/// Build the base conversion prompt for a language pair and code body.
pub fn base_prompt(source_lang: &str, target_lang: &str, code: &str) -> String {
    format!(
        "Convert the following {source_lang} code to {target_lang}.\n\
         Preserve the program's behaviour and structure exactly.\n\
         Output ONLY the converted code, with no commentary.\n\n\
         ```{source_lang}\n{code}\n```"
    )
}

/// Extra instructions appended when converting from a C-family language.
///
/// Pointer and macro semantics are where naive translations go wrong most
/// often, so they are called out explicitly.
pub const C_FAMILY_SUFFIX: &str = "\
Make sure to:
1. Convert every function and data structure completely.
2. Handle pointers and memory management correctly.
3. Translate macro definitions and preprocessor directives.
4. Keep the same behaviour and logic.
5. Produce code that compiles and runs as-is.
6. Include all necessary imports or headers.";

/// Extra instructions appended when converting from a Python-family language.
pub const PYTHON_FAMILY_SUFFIX: &str = "\
Make sure to:
1. Convert every function, class, and method completely.
2. Handle indentation-sensitive constructs correctly.
3. Translate comprehensions, generators, and decorators.
4. Handle module imports and package structure.
5. Keep the same behaviour and logic.
6. Produce code that runs as-is.
7. Translate exception handling faithfully.
8. Follow the target language's idioms and best practices.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_prompt_names_both_languages() {
        let p = base_prompt("c", "python", "int main(void) { return 0; }");
        assert!(p.contains("Convert the following c code to python"));
        assert!(p.contains("int main(void)"));
    }

    #[test]
    fn base_prompt_fences_the_code() {
        let p = base_prompt("python", "go", "print(1)");
        assert!(p.contains("```python\nprint(1)\n```"));
    }
}
