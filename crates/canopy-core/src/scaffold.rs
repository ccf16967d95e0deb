//! New-project scaffolding: language selection, pre-commit config, justfile,
//! MOTD, test framework stubs, and type checker configs.

use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Go,
    Typescript,
    Rust,
    Shell,
    Prose,
    Other,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::Python,
        Language::Go,
        Language::Typescript,
        Language::Rust,
        Language::Shell,
        Language::Prose,
        Language::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Go => "go",
            Language::Typescript => "typescript",
            Language::Rust => "rust",
            Language::Shell => "shell",
            Language::Prose => "prose",
            Language::Other => "other",
        }
    }

    /// Label used by the interactive selector.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Go => "Go",
            Language::Typescript => "TypeScript",
            Language::Rust => "Rust",
            Language::Shell => "Shell",
            Language::Prose => "Prose/Docs",
            Language::Other => "Other",
        }
    }

    pub fn parse(code: &str) -> Option<Language> {
        Self::ALL.iter().copied().find(|l| l.code() == code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parse a comma-separated `--lang` value. The first entry is the primary
/// language.
pub fn parse_lang_list(value: &str) -> Result<Vec<Language>, String> {
    let mut languages = Vec::new();
    let mut invalid = Vec::new();
    for part in value.split(',') {
        let code = part.trim();
        match Language::parse(code) {
            Some(lang) => languages.push(lang),
            None => invalid.push(code.to_string()),
        }
    }
    if !invalid.is_empty() {
        let valid: Vec<&str> = Language::ALL.iter().map(|l| l.code()).collect();
        return Err(format!(
            "invalid language(s): {}. Valid options: {}",
            invalid.join(", "),
            valid.join(", ")
        ));
    }
    Ok(languages)
}

struct Hook {
    id: &'static str,
    args: &'static [&'static str],
    additional_dependencies: &'static [&'static str],
}

const fn hook(id: &'static str) -> Hook {
    Hook { id, args: &[], additional_dependencies: &[] }
}

struct HookRepo {
    repo: &'static str,
    rev: &'static str,
    hooks: &'static [Hook],
}

const BASE_REPOS: &[HookRepo] = &[
    HookRepo {
        repo: "https://github.com/pre-commit/pre-commit-hooks",
        rev: "v5.0.0",
        hooks: &[
            hook("trailing-whitespace"),
            hook("end-of-file-fixer"),
            hook("check-added-large-files"),
        ],
    },
    HookRepo {
        repo: "https://github.com/gitleaks/gitleaks",
        rev: "v8.24.2",
        hooks: &[hook("gitleaks")],
    },
];

fn language_repos(lang: Language) -> &'static [HookRepo] {
    const PYTHON_REPOS: &[HookRepo] = &[HookRepo {
        repo: "https://github.com/astral-sh/ruff-pre-commit",
        rev: "v0.8.6",
        hooks: &[
            Hook { id: "ruff", args: &["--fix"], additional_dependencies: &[] },
            hook("ruff-format"),
        ],
    }];
    const GO_REPOS: &[HookRepo] = &[HookRepo {
        repo: "https://github.com/golangci/golangci-lint",
        rev: "v1.62.0",
        hooks: &[hook("golangci-lint")],
    }];
    const TYPESCRIPT_REPOS: &[HookRepo] = &[HookRepo {
        repo: "https://github.com/biomejs/pre-commit",
        rev: "v0.6.0",
        hooks: &[Hook {
            id: "biome-check",
            args: &[],
            additional_dependencies: &["@biomejs/biome@1.9.0"],
        }],
    }];
    const RUST_REPOS: &[HookRepo] = &[HookRepo {
        repo: "https://github.com/doublify/pre-commit-rust",
        rev: "v1.0",
        hooks: &[hook("fmt"), hook("cargo-check")],
    }];
    const SHELL_REPOS: &[HookRepo] = &[HookRepo {
        repo: "https://github.com/shellcheck-py/shellcheck-py",
        rev: "v0.10.0.1",
        hooks: &[hook("shellcheck")],
    }];
    const PROSE_REPOS: &[HookRepo] = &[
        HookRepo {
            repo: "https://github.com/igorshubovych/markdownlint-cli",
            rev: "v0.43.0",
            hooks: &[hook("markdownlint")],
        },
        HookRepo {
            repo: "https://github.com/codespell-project/codespell",
            rev: "v2.3.0",
            hooks: &[hook("codespell")],
        },
    ];
    match lang {
        Language::Python => PYTHON_REPOS,
        Language::Go => GO_REPOS,
        Language::Typescript => TYPESCRIPT_REPOS,
        Language::Rust => RUST_REPOS,
        Language::Shell => SHELL_REPOS,
        Language::Prose => PROSE_REPOS,
        Language::Other => &[],
    }
}

fn format_repo_yaml(repo: &HookRepo, out: &mut String) {
    out.push_str(&format!("  - repo: {}\n", repo.repo));
    out.push_str(&format!("    rev: {}\n", repo.rev));
    out.push_str("    hooks:\n");
    for hook in repo.hooks {
        out.push_str(&format!("        - id: {}\n", hook.id));
        if !hook.args.is_empty() {
            out.push_str(&format!("          args: [{}]\n", hook.args.join(", ")));
        }
        if !hook.additional_dependencies.is_empty() {
            let deps: Vec<String> = hook
                .additional_dependencies
                .iter()
                .map(|d| format!("\"{d}\""))
                .collect();
            out.push_str(&format!(
                "          additional_dependencies: [{}]\n",
                deps.join(", ")
            ));
        }
    }
}

/// Assemble `.pre-commit-config.yaml`: base hooks always, then per-language
/// repos with duplicates (prose sharing a repo with another selection)
/// skipped.
pub fn precommit_config(languages: &[Language]) -> String {
    let mut out = String::from("repos:\n");
    let mut added: Vec<&str> = Vec::new();

    for repo in BASE_REPOS {
        format_repo_yaml(repo, &mut out);
        added.push(repo.repo);
    }

    for lang in languages {
        for repo in language_repos(*lang) {
            if !added.contains(&repo.repo) {
                format_repo_yaml(repo, &mut out);
                added.push(repo.repo);
            }
        }
    }

    out
}

pub fn precommit_install_command() -> Vec<String> {
    vec!["pre-commit".to_string(), "install".to_string()]
}

pub fn justfile_content(lang: Language, project_name: &str) -> String {
    let module_name = project_name.replace('-', "_");
    match lang {
        Language::Python => format!(
            "# Run the project\n\
             run:\n    uv run python src/{module_name}/main.py\n\n\
             # Run tests\n\
             test:\n    uv run pytest\n\n\
             # Run tests continuously (on file change)\n\
             watch:\n    fd -e py | entr -c uv run pytest\n\n\
             # Add a dependency\n\
             add *packages:\n    uv add {{{{packages}}}}\n"
        ),
        Language::Typescript => "# Run the project\n\
             run:\n    bun run index.ts\n\n\
             # Run tests\n\
             test:\n    bun test\n\n\
             # Run tests continuously (on file change)\n\
             watch:\n    fd -e ts | entr -c bun test\n\n\
             # Add a dependency\n\
             add *packages:\n    bun add {{packages}}\n"
            .to_string(),
        Language::Go => "# Run the project\n\
             run:\n    go run .\n\n\
             # Run tests\n\
             test:\n    go test ./...\n\n\
             # Run tests continuously (on file change)\n\
             watch:\n    fd -e go | entr -c go test ./...\n\n\
             # Add a dependency\n\
             add *packages:\n    go get {{packages}}\n"
            .to_string(),
        Language::Rust => "# Run the project\n\
             run:\n    cargo run\n\n\
             # Run tests\n\
             test:\n    cargo test\n\n\
             # Run tests continuously (on file change)\n\
             watch:\n    fd -e rs | entr -c cargo test\n\n\
             # Add a dependency\n\
             add *packages:\n    cargo add {{packages}}\n"
            .to_string(),
        _ => "# Run the project\n\
             run:\n    echo \"No run command configured\"\n\n\
             # Run tests\n\
             test:\n    echo \"No test command configured\"\n"
            .to_string(),
    }
}

pub fn motd_content(project_name: &str) -> String {
    format!(
        "{project_name}\n\n  \
         just run     - run the project\n  \
         just test    - run tests\n  \
         just watch   - run tests on file change\n  \
         just add X   - add dependency\n"
    )
}

/// Type checker setup for languages without one built in.
pub fn type_checker_config(lang: Language) -> Option<(&'static str, String)> {
    match lang {
        Language::Python => Some((
            "pyproject.toml",
            "[tool.ty]\n\
             # ty type checker configuration\n\
             # See: https://github.com/astral-sh/ty\n"
                .to_string(),
        )),
        Language::Typescript => {
            let tsconfig = serde_json::json!({
                "compilerOptions": {
                    "strict": true,
                    "noEmit": true,
                    "target": "ES2022",
                    "module": "NodeNext",
                    "moduleResolution": "NodeNext",
                    "esModuleInterop": true,
                    "skipLibCheck": true,
                    "forceConsistentCasingInFileNames": true,
                },
                "include": ["**/*.ts", "**/*.tsx"],
                "exclude": ["node_modules", "dist"],
            });
            Some((
                "tsconfig.json",
                serde_json::to_string_pretty(&tsconfig).unwrap_or_default(),
            ))
        }
        // Go and Rust check types in the compiler; the rest have none.
        _ => None,
    }
}

/// Test framework stubs for the primary language. Paths and contents may
/// contain `{{PROJECT_NAME}}` / `{{PROJECT_NAME_UNDERSCORE}}` placeholders.
#[derive(Debug, Default)]
pub struct TestFramework {
    pub config_file: Option<&'static str>,
    pub config_content: &'static str,
    pub example_test_file: Option<&'static str>,
    pub example_test_content: &'static str,
    pub main_file: Option<&'static str>,
    pub main_content: &'static str,
    pub init_file: Option<&'static str>,
    pub tests_init_file: Option<&'static str>,
}

pub fn test_framework(lang: Language) -> TestFramework {
    match lang {
        Language::Python => TestFramework {
            config_file: Some("pyproject.toml"),
            config_content: r#"[project]
name = "{{PROJECT_NAME}}"
version = "0.1.0"
description = ""
requires-python = ">=3.12"
dependencies = []

[dependency-groups]
dev = ["pytest", "pytest-watch"]

[project.scripts]
{{PROJECT_NAME}} = "{{PROJECT_NAME_UNDERSCORE}}.main:main"

[tool.hatch.build.targets.wheel]
packages = ["src/{{PROJECT_NAME_UNDERSCORE}}"]

[tool.pytest.ini_options]
testpaths = ["tests"]
pythonpath = ["src"]
python_files = ["test_*.py", "*_test.py"]
python_functions = ["test_*"]
addopts = "-v --tb=short"
"#,
            example_test_file: Some("tests/test_main.py"),
            example_test_content: r#"from {{PROJECT_NAME_UNDERSCORE}}.main import hello


def test_hello():
    assert hello() == "Hello, World!"
"#,
            main_file: Some("src/{{PROJECT_NAME_UNDERSCORE}}/main.py"),
            main_content: r#"def hello() -> str:
    return "Hello, World!"


def main() -> None:
    print(hello())


if __name__ == "__main__":
    main()
"#,
            init_file: Some("src/{{PROJECT_NAME_UNDERSCORE}}/__init__.py"),
            tests_init_file: Some("tests/__init__.py"),
        },
        Language::Typescript => TestFramework {
            config_file: None,
            config_content: "# Bun has built-in testing. Run tests with: bun test",
            example_test_file: Some("src/example.test.ts"),
            example_test_content: r#"import { describe, it, expect } from 'bun:test';

describe('Example tests', () => {
  it('should pass a basic test', () => {
    expect(true).toBe(true);
  });

  it('should perform arithmetic correctly', () => {
    expect(1 + 1).toBe(2);
  });

  it('should handle string operations', () => {
    const result = 'hello'.toUpperCase();
    expect(result).toBe('HELLO');
  });
});
"#,
            ..TestFramework::default()
        },
        Language::Go => TestFramework {
            config_file: None,
            config_content: "# Go uses built-in testing. Run tests with: go test ./...",
            example_test_file: Some("example_test.go"),
            example_test_content: r#"package main

import "testing"

func TestExample(t *testing.T) {
	if false {
		t.Error("This should always pass")
	}
}

func TestAddition(t *testing.T) {
	result := 1 + 1
	if result != 2 {
		t.Errorf("expected 2, got %d", result)
	}
}

func TestStringOperations(t *testing.T) {
	result := "hello"
	if result != "hello" {
		t.Errorf("expected hello, got %s", result)
	}
}
"#,
            main_file: Some("main.go"),
            main_content: r#"package main

import "fmt"

func main() {
	fmt.Println("Hello, world!")
}
"#,
            ..TestFramework::default()
        },
        Language::Rust => TestFramework {
            config_file: None,
            config_content: "# Rust uses built-in testing. Run tests with: cargo test",
            // src/main.rs so `cargo init` keeps the binary layout.
            example_test_file: Some("src/main.rs"),
            example_test_content: r#"fn main() {
    println!("Hello, world!");
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_example_passes() {
        assert!(true, "This should always pass");
    }

    #[test]
    fn test_addition() {
        let result = 1 + 1;
        assert_eq!(result, 2, "1 + 1 should equal 2");
    }

    #[test]
    fn test_string_operations() {
        let result = "hello".to_uppercase();
        assert_eq!(result, "HELLO");
    }
}
"#,
            ..TestFramework::default()
        },
        _ => TestFramework::default(),
    }
}

/// Commands run inside the container after a fresh project's first start.
pub fn init_commands(lang: Language, project_name: &str) -> Vec<Vec<String>> {
    let cmd = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect();
    match lang {
        // pyproject.toml is written during scaffolding, only the tests dir
        // is missing.
        Language::Python => vec![cmd(&["mkdir", "-p", "tests"])],
        Language::Typescript => vec![cmd(&["bun", "init"])],
        Language::Go => vec![cmd(&["go", "mod", "init", project_name])],
        Language::Rust => vec![cmd(&["cargo", "init", "--name", project_name])],
        Language::Shell => vec![cmd(&["mkdir", "-p", "src"])],
        Language::Prose => vec![cmd(&["mkdir", "-p", "docs"])],
        Language::Other => vec![cmd(&["mkdir", "-p", "src"])],
    }
}

fn replace_placeholders(text: &str, project_name: &str) -> String {
    let module_name = project_name.replace('-', "_");
    text.replace("{{PROJECT_NAME}}", project_name)
        .replace("{{PROJECT_NAME_UNDERSCORE}}", &module_name)
}

/// Copy host-installed template files (AGENTS.md, .gitignore, ...) from
/// `~/.config/canopy/templates/` when present. Absence is a warning only.
pub fn copy_template_files(target_dir: &Path) -> std::io::Result<()> {
    let templates_dir = match dirs::config_dir() {
        Some(dir) => dir.join("canopy").join("templates"),
        None => return Ok(()),
    };
    if !templates_dir.exists() {
        tracing::warn!(path = %templates_dir.display(), "templates directory not found");
        return Ok(());
    }

    for name in ["AGENTS.md", "CLAUDE.md", "GEMINI.md", ".gitignore", ".editorconfig"] {
        let src = templates_dir.join(name);
        if src.exists() {
            std::fs::copy(&src, target_dir.join(name))?;
            tracing::debug!(name, "copied template");
        }
    }
    Ok(())
}

/// Write every generated file for a new project directory.
pub fn write_project_files(
    project_path: &Path,
    project_name: &str,
    languages: &[Language],
) -> std::io::Result<()> {
    let primary = languages.first().copied().unwrap_or(Language::Other);

    copy_template_files(project_path)?;
    std::fs::write(project_path.join("MOTD"), motd_content(project_name))?;
    std::fs::write(
        project_path.join("justfile"),
        justfile_content(primary, project_name),
    )?;
    std::fs::write(
        project_path.join(".pre-commit-config.yaml"),
        precommit_config(languages),
    )?;

    let framework = test_framework(primary);

    if let Some(config_file) = framework.config_file {
        let path = project_path.join(config_file);
        let content = replace_placeholders(framework.config_content, project_name);
        if path.exists() {
            let existing = std::fs::read_to_string(&path)?;
            std::fs::write(&path, format!("{existing}\n{content}"))?;
        } else {
            std::fs::write(&path, content)?;
        }
    }

    if let (Some(main_file), false) = (framework.main_file, framework.main_content.is_empty()) {
        let path = project_path.join(replace_placeholders(main_file, project_name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, framework.main_content)?;
    }

    for init in [framework.init_file, framework.tests_init_file].into_iter().flatten() {
        let path = project_path.join(replace_placeholders(init, project_name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, "")?;
    }

    if let Some(test_file) = framework.example_test_file {
        let path = project_path.join(test_file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(
            &path,
            replace_placeholders(framework.example_test_content, project_name),
        )?;
    }

    if let Some((config_file, content)) = type_checker_config(primary) {
        let path = project_path.join(config_file);
        if path.exists() {
            let existing = std::fs::read_to_string(&path)?;
            std::fs::write(&path, format!("{existing}\n{content}"))?;
        } else {
            std::fs::write(&path, content)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lang_list_parsing_validates_each_entry() {
        assert_eq!(
            parse_lang_list("python, rust").unwrap(),
            vec![Language::Python, Language::Rust]
        );
        let err = parse_lang_list("python,klingon").unwrap_err();
        assert!(err.contains("klingon"));
        assert!(err.contains("typescript"));
    }

    #[test]
    fn precommit_always_includes_base_hooks() {
        let yaml = precommit_config(&[]);
        assert!(yaml.starts_with("repos:\n"));
        assert!(yaml.contains("pre-commit/pre-commit-hooks"));
        assert!(yaml.contains("rev: v5.0.0"));
        assert!(yaml.contains("gitleaks"));
    }

    #[test]
    fn precommit_adds_language_repos_without_duplicates() {
        let yaml = precommit_config(&[Language::Python, Language::Python, Language::Prose]);
        assert_eq!(yaml.matches("astral-sh/ruff-pre-commit").count(), 1);
        assert!(yaml.contains("args: [--fix]"));
        assert!(yaml.contains("markdownlint-cli"));
        assert!(yaml.contains("codespell"));
    }

    #[test]
    fn typescript_hook_carries_pinned_dependency() {
        let yaml = precommit_config(&[Language::Typescript]);
        assert!(yaml.contains("additional_dependencies: [\"@biomejs/biome@1.9.0\"]"));
    }

    #[test]
    fn python_project_files_use_underscored_module() {
        let dir = TempDir::new().unwrap();
        write_project_files(dir.path(), "my-app", &[Language::Python]).unwrap();

        assert!(dir.path().join("src/my_app/main.py").exists());
        assert!(dir.path().join("src/my_app/__init__.py").exists());
        assert!(dir.path().join("tests/__init__.py").exists());
        let pyproject = std::fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(pyproject.contains("name = \"my-app\""));
        assert!(pyproject.contains("my-app = \"my_app.main:main\""));
        // Type checker config appended to the same file.
        assert!(pyproject.contains("[tool.ty]"));
    }

    #[test]
    fn rust_project_gets_binary_stub_and_justfile() {
        let dir = TempDir::new().unwrap();
        write_project_files(dir.path(), "tool", &[Language::Rust]).unwrap();

        let main = std::fs::read_to_string(dir.path().join("src/main.rs")).unwrap();
        assert!(main.contains("fn main()"));
        let justfile = std::fs::read_to_string(dir.path().join("justfile")).unwrap();
        assert!(justfile.contains("cargo test"));
        assert!(dir.path().join("MOTD").exists());
        assert!(!dir.path().join("tsconfig.json").exists());
    }

    #[test]
    fn init_commands_name_the_project() {
        assert_eq!(
            init_commands(Language::Go, "svc"),
            vec![vec!["go", "mod", "init", "svc"]]
        );
        assert_eq!(
            init_commands(Language::Rust, "svc")[0],
            vec!["cargo", "init", "--name", "svc"]
        );
    }
}
