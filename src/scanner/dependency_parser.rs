use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use toml::Value as TomlValue;

/// 依赖清单文件名 -> 包管理生态
const MANIFESTS: &[(&str, &str)] = &[
    ("requirements.txt", "python"),
    ("Pipfile", "python"),
    ("pyproject.toml", "python"),
    ("setup.py", "python"),
    ("package.json", "javascript"),
    ("Cargo.toml", "rust"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("build.gradle.kts", "java"),
    ("go.mod", "go"),
    ("Gemfile", "ruby"),
    ("composer.json", "php"),
];

/// 文件名对应的生态，不是依赖清单时返回 `None`
pub fn manifest_ecosystem(file_name: &str) -> Option<&'static str> {
    MANIFESTS
        .iter()
        .find(|(name, _)| *name == file_name)
        .map(|(_, ecosystem)| *ecosystem)
}

/// 解析依赖清单，返回排序去重后的包名
///
/// JSON / TOML 格式错误时返回错误；不认识的文件名返回空列表。
pub fn parse_manifest(file_name: &str, content: &str) -> Result<Vec<String>> {
    let names = match file_name {
        "requirements.txt" => parse_requirements(content)?,
        "Pipfile" => parse_pipfile(content)?,
        "pyproject.toml" => parse_pyproject(content)?,
        "setup.py" => parse_setup_py(content)?,
        "package.json" => parse_package_json(content)?,
        "Cargo.toml" => parse_cargo_toml(content)?,
        "pom.xml" => parse_pom(content)?,
        "build.gradle" | "build.gradle.kts" => parse_gradle(content)?,
        "go.mod" => parse_go_mod(content),
        "Gemfile" => parse_gemfile(content)?,
        "composer.json" => parse_composer(content)?,
        _ => Vec::new(),
    };

    Ok(names
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect())
}

/// PEP 508 依赖声明开头的包名
static REQUIREMENT_NAME: OnceLock<Option<Regex>> = OnceLock::new();

/// 从 PEP 508 依赖声明中取出包名
fn requirement_name(spec: &str) -> Option<String> {
    let re = REQUIREMENT_NAME
        .get_or_init(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._\-]*)").ok())
        .as_ref()?;
    re.captures(spec).map(|c| c[1].to_string())
}

fn parse_requirements(content: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(name) = requirement_name(line) {
            names.push(name);
        }
    }
    Ok(names)
}

fn parse_toml(content: &str, file_name: &str) -> Result<TomlValue> {
    toml::from_str(content).with_context(|| format!("无法解析 {}", file_name))
}

fn table_keys(value: Option<&TomlValue>) -> Vec<String> {
    value
        .and_then(|v| v.as_table())
        .map(|table| table.keys().cloned().collect())
        .unwrap_or_default()
}

fn parse_pipfile(content: &str) -> Result<Vec<String>> {
    let doc = parse_toml(content, "Pipfile")?;
    let mut names = table_keys(doc.get("packages"));
    names.extend(table_keys(doc.get("dev-packages")));
    Ok(names)
}

fn parse_pyproject(content: &str) -> Result<Vec<String>> {
    let doc = parse_toml(content, "pyproject.toml")?;
    let mut names = Vec::new();

    if let Some(project) = doc.get("project") {
        let mut specs: Vec<&TomlValue> = Vec::new();
        if let Some(deps) = project.get("dependencies").and_then(|d| d.as_array()) {
            specs.extend(deps.iter());
        }
        if let Some(optional) = project.get("optional-dependencies").and_then(|o| o.as_table()) {
            for group in optional.values().filter_map(|g| g.as_array()) {
                specs.extend(group.iter());
            }
        }
        for spec in specs.into_iter().filter_map(|s| s.as_str()) {
            if let Some(name) = requirement_name(spec) {
                names.push(name);
            }
        }
    }

    if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
        names.extend(table_keys(poetry.get("dependencies")));
        names.extend(table_keys(poetry.get("dev-dependencies")));
        if let Some(groups) = poetry.get("group").and_then(|g| g.as_table()) {
            for group in groups.values() {
                names.extend(table_keys(group.get("dependencies")));
            }
        }
        // poetry 把解释器版本写在依赖表里
        names.retain(|name| name != "python");
    }

    Ok(names)
}

fn parse_setup_py(content: &str) -> Result<Vec<String>> {
    let block = Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]")?;
    let quoted = Regex::new(r#"['"]([^'"]+)['"]"#)?;

    let mut names = Vec::new();
    for captures in block.captures_iter(content) {
        for spec in quoted.captures_iter(&captures[1]) {
            if let Some(name) = requirement_name(&spec[1]) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

fn json_keys(doc: &JsonValue, field: &str) -> Vec<String> {
    doc.get(field)
        .and_then(|v| v.as_object())
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

fn parse_package_json(content: &str) -> Result<Vec<String>> {
    let doc: JsonValue = serde_json::from_str(content).context("无法解析 package.json")?;
    let mut names = json_keys(&doc, "dependencies");
    names.extend(json_keys(&doc, "devDependencies"));
    Ok(names)
}

fn parse_cargo_toml(content: &str) -> Result<Vec<String>> {
    let doc = parse_toml(content, "Cargo.toml")?;
    let mut names = Vec::new();
    for section in ["dependencies", "dev-dependencies", "build-dependencies"] {
        names.extend(table_keys(doc.get(section)));
    }
    names.extend(table_keys(doc.get("workspace").and_then(|w| w.get("dependencies"))));
    Ok(names)
}

fn parse_pom(content: &str) -> Result<Vec<String>> {
    // 只看 <dependency> 块，避免把项目自身的 artifactId 算进去
    let dependency = Regex::new(r"(?s)<dependency>(.*?)</dependency>")?;
    let artifact = Regex::new(r"<artifactId>\s*([^<\s]+)\s*</artifactId>")?;

    Ok(dependency
        .captures_iter(content)
        .filter_map(|block| artifact.captures(&block[1]).map(|c| c[1].to_string()))
        .collect())
}

fn parse_gradle(content: &str) -> Result<Vec<String>> {
    let re = Regex::new(
        r#"(?m)^\s*(?:implementation|api|compileOnly|runtimeOnly|testImplementation|testRuntimeOnly|annotationProcessor|kapt)\s*\(?\s*['"]([^:'"\s]+):([^:'"\s]+)"#,
    )?;
    Ok(re
        .captures_iter(content)
        .map(|c| format!("{}:{}", &c[1], &c[2]))
        .collect())
}

fn parse_go_mod(content: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let line = line.trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
            } else if let Some(module) = line.split_whitespace().next() {
                if !module.starts_with("//") {
                    names.push(module.to_string());
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest.starts_with('(') {
                in_block = true;
            } else if let Some(module) = rest.split_whitespace().next() {
                names.push(module.to_string());
            }
        }
    }
    names
}

fn parse_gemfile(content: &str) -> Result<Vec<String>> {
    let re = Regex::new(r#"(?m)^\s*gem\s+['"]([A-Za-z0-9_.\-]+)['"]"#)?;
    Ok(re.captures_iter(content).map(|c| c[1].to_string()).collect())
}

fn parse_composer(content: &str) -> Result<Vec<String>> {
    let doc: JsonValue = serde_json::from_str(content).context("无法解析 composer.json")?;
    let mut names = json_keys(&doc, "require");
    names.extend(json_keys(&doc, "require-dev"));
    // 平台依赖不是包
    names.retain(|name| name != "php" && !name.starts_with("ext-"));
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_ecosystem() {
        assert_eq!(manifest_ecosystem("Cargo.toml"), Some("rust"));
        assert_eq!(manifest_ecosystem("build.gradle.kts"), Some("java"));
        assert_eq!(manifest_ecosystem("cargo.toml"), None);
        assert_eq!(manifest_ecosystem("README.md"), None);
    }

    #[test]
    fn test_requirements_txt() {
        let content = "# comment\nflask==2.0\nrequests>=2.28 ; python_version > '3'\n\n-r base.txt\nFlask-Login\nflask\n";
        let deps = parse_manifest("requirements.txt", content).unwrap();
        assert_eq!(deps, vec!["Flask-Login", "flask", "requests"]);
    }

    #[test]
    fn test_requirement_name_pattern_is_compiled_once() {
        assert_eq!(requirement_name("django>=4.2").as_deref(), Some("django"));
        let first = REQUIREMENT_NAME.get().unwrap().as_ref().unwrap() as *const Regex;

        assert_eq!(requirement_name("  numpy[extra]").as_deref(), Some("numpy"));
        assert_eq!(requirement_name("=="), None);
        let second = REQUIREMENT_NAME.get().unwrap().as_ref().unwrap() as *const Regex;
        assert_eq!(first, second);
    }

    #[test]
    fn test_pyproject_project_and_poetry() {
        let content = r#"
[project]
name = "demo"
dependencies = ["httpx>=0.24", "pydantic"]

[project.optional-dependencies]
dev = ["pytest"]

[tool.poetry.dependencies]
python = "^3.11"
rich = "*"
"#;
        let deps = parse_manifest("pyproject.toml", content).unwrap();
        assert_eq!(deps, vec!["httpx", "pydantic", "pytest", "rich"]);
    }

    #[test]
    fn test_setup_py() {
        let content = "setup(\n  name='x',\n  install_requires=[\n    'numpy>=1.0',\n    \"pandas\",\n  ],\n)";
        let deps = parse_manifest("setup.py", content).unwrap();
        assert_eq!(deps, vec!["numpy", "pandas"]);
    }

    #[test]
    fn test_package_json() {
        let content = r#"{"name":"web","dependencies":{"react":"^18"},"devDependencies":{"vite":"^5","react":"^18"}}"#;
        let deps = parse_manifest("package.json", content).unwrap();
        assert_eq!(deps, vec!["react", "vite"]);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_manifest("package.json", "{ not json").is_err());
        assert!(parse_manifest("composer.json", "").is_err());
        assert!(parse_manifest("Cargo.toml", "[dependencies\nserde = ").is_err());
    }

    #[test]
    fn test_cargo_toml() {
        let content = r#"
[package]
name = "demo"

[dependencies]
serde = { version = "1", features = ["derive"] }
anyhow = "1"

[dev-dependencies]
tempfile = "3"
"#;
        let deps = parse_manifest("Cargo.toml", content).unwrap();
        assert_eq!(deps, vec!["anyhow", "serde", "tempfile"]);
    }

    #[test]
    fn test_pom_ignores_project_artifact() {
        let content = r#"<project>
  <artifactId>my-app</artifactId>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    <dependency><groupId>junit</groupId><artifactId>junit</artifactId></dependency>
  </dependencies>
</project>"#;
        let deps = parse_manifest("pom.xml", content).unwrap();
        assert_eq!(deps, vec!["junit", "spring-boot-starter-web"]);
    }

    #[test]
    fn test_gradle() {
        let content = "dependencies {\n  implementation 'com.google.guava:guava:32.0'\n  testImplementation(\"junit:junit:4.13\")\n}\n";
        let deps = parse_manifest("build.gradle", content).unwrap();
        assert_eq!(deps, vec!["com.google.guava:guava", "junit:junit"]);
    }

    #[test]
    fn test_go_mod() {
        let content = "module example.com/app\n\ngo 1.21\n\nrequire github.com/spf13/cobra v1.8.0\n\nrequire (\n\tgolang.org/x/sync v0.5.0\n\t// comment\n\tgithub.com/stretchr/testify v1.8.4 // indirect\n)\n";
        let deps = parse_manifest("go.mod", content).unwrap();
        assert_eq!(
            deps,
            vec![
                "github.com/spf13/cobra",
                "github.com/stretchr/testify",
                "golang.org/x/sync"
            ]
        );
    }

    #[test]
    fn test_gemfile_and_composer() {
        let gemfile = "source 'https://rubygems.org'\ngem 'rails', '~> 7.0'\n  gem \"puma\"\n";
        assert_eq!(parse_manifest("Gemfile", gemfile).unwrap(), vec!["puma", "rails"]);

        let composer = r#"{"require":{"php":">=8.1","laravel/framework":"^10","ext-json":"*"},"require-dev":{"phpunit/phpunit":"^10"}}"#;
        assert_eq!(
            parse_manifest("composer.json", composer).unwrap(),
            vec!["laravel/framework", "phpunit/phpunit"]
        );
    }
}
