// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed project and a fluent builder so each
// integration test can set up an isolated environment without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::Path;

use envresolve::cli::GlobalOpts;
use envresolve::commands::CommandSetup;
use envresolve::config::ProjectConfig;
use envresolve::logging::Logger;
use envresolve::platform::PlatformId;

/// Root fragment of the sample project: imports a Rust toolchain fragment and
/// a hooks fragment, and pulls in Darwin-only native libraries.
pub const ROOT_TOML: &str = r#"
imports = ["rust", "hooks"]
tools = ["git", "sqlx-cli"]

[project]
name = "demo"
offline = true
systems = ["x86_64-linux", "aarch64-linux", "aarch64-darwin"]

[env]
RUST_LOG = "info"

[[conditional]]
when = { family = "darwin" }
native = [{ name = "darwin.apple_sdk.frameworks.Security" }, { name = "libiconv" }]
"#;

/// Stable Rust with a required channel.
pub const RUST_TOML: &str = r#"
tools = ["cargo-watch"]

[toolchain]
name = "rust"
channel = "stable"
components = ["rustfmt", "clippy"]
required = true
"#;

/// Lint declared before format; tests explicitly disabled.
pub const HOOKS_TOML: &str = r#"
[[hooks]]
name = "clippy"
enabled = true

[[hooks]]
name = "rustfmt"
enabled = true

[[hooks]]
name = "cargo-test"
enabled = false
"#;

/// Write the sample project into `root`.
///
/// Creates:
/// - `envresolve.toml`       — project table and root fragment
/// - `fragments/rust.toml`   — toolchain
/// - `fragments/hooks.toml`  — quality gates
pub fn setup_sample_project(root: &Path) {
    std::fs::create_dir_all(root.join("fragments")).expect("create fragments dir");
    std::fs::write(root.join("envresolve.toml"), ROOT_TOML).expect("write envresolve.toml");
    std::fs::write(root.join("fragments/rust.toml"), RUST_TOML).expect("write rust.toml");
    std::fs::write(root.join("fragments/hooks.toml"), HOOKS_TOML).expect("write hooks.toml");
}

/// An isolated test project backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory containing the test project.
    pub root: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with the sample project.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        setup_sample_project(root.path());
        Self { root }
    }

    /// Path to the project root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Load the project configuration.
    pub fn load(&self) -> ProjectConfig {
        ProjectConfig::load(self.root.path()).expect("load project")
    }

    /// Global options pointing at this project, with the disk cache off.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            root: Some(self.root.path().to_path_buf()),
            no_cache: true,
        }
    }

    /// Run the shared command setup for `platform`.
    pub fn setup(&self, platform: &str) -> CommandSetup {
        let platform = PlatformId::new(platform).expect("valid platform");
        CommandSetup::init(&self.global(), Some(&platform), &Logger::new("test"))
            .expect("command setup")
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a new context backed by the sample project.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext::new(),
        }
    }

    /// Write `content` to `fragments/<id>.toml`, replacing any existing file.
    pub fn with_fragment(self, id: &str, content: &str) -> Self {
        let path = self.ctx.root.path().join("fragments").join(format!("{id}.toml"));
        std::fs::write(path, content).expect("write fragment");
        self
    }

    /// Replace `envresolve.toml`.
    pub fn with_root(self, content: &str) -> Self {
        std::fs::write(self.ctx.root.path().join("envresolve.toml"), content)
            .expect("write envresolve.toml");
        self
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}
