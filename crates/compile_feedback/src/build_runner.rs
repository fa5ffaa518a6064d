use std::path::{Path, PathBuf};
use std::process::Command;

use log::{error, info};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Project directory does not exist")]
    InvalidProjectDir,
    #[error("No pom.xml or build.gradle found in project directory")]
    NotBuildProject,
    #[error("Command execution error: {0}")]
    CommandError(String),
}

/// Result of one compilation run. `logs` merges stdout and stderr since
/// build tools write diagnostics to both.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub success: bool,
    pub logs: String,
}

/// The compilation sandbox as seen by the pipeline.
pub trait Compiler: Send + Sync {
    fn compile(&self, project_dir: &Path) -> Result<CompileOutcome, BuildError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildTool {
    Maven,
    Gradle,
}

/// Default [`Compiler`] that shells out to the Maven or Gradle wrapper of
/// the generated project.
#[derive(Debug, Default)]
pub struct BuildRunner;

impl BuildRunner {
    pub fn new() -> Self {
        Self
    }

    fn detect_tool(project_dir: &Path) -> Result<BuildTool, BuildError> {
        if project_dir.join("pom.xml").exists() {
            Ok(BuildTool::Maven)
        } else if project_dir.join("build.gradle").exists()
            || project_dir.join("build.gradle.kts").exists()
        {
            Ok(BuildTool::Gradle)
        } else {
            error!(
                "No supported build file found in {}",
                project_dir.display()
            );
            Err(BuildError::NotBuildProject)
        }
    }

    fn command_for(tool: BuildTool) -> (PathBuf, Vec<&'static str>) {
        match tool {
            BuildTool::Maven => ("mvn".into(), vec!["-B", "compile"]),
            BuildTool::Gradle => ("gradle".into(), vec!["compileJava", "--console=plain"]),
        }
    }
}

impl Compiler for BuildRunner {
    fn compile(&self, project_dir: &Path) -> Result<CompileOutcome, BuildError> {
        if !project_dir.exists() {
            error!("Project directory does not exist: {}", project_dir.display());
            return Err(BuildError::InvalidProjectDir);
        }
        let tool = Self::detect_tool(project_dir)?;
        let (program, args) = Self::command_for(tool);
        info!(
            "Compiling {} with {:?}",
            project_dir.display(),
            program.display()
        );

        let output = Command::new(&program)
            .args(&args)
            .current_dir(project_dir)
            .output()
            .map_err(|e| {
                let msg = format!("Failed to execute {}: {}", program.display(), e);
                error!("{}", msg);
                BuildError::CommandError(msg)
            })?;

        let mut logs = String::new();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.is_empty() {
            logs.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !logs.is_empty() {
                logs.push('\n');
            }
            logs.push_str(&stderr);
        }
        let success = output.status.success();
        if success {
            info!("Compilation succeeded");
        } else {
            error!(
                "Compilation failed with status {}",
                output.status.code().unwrap_or(-1)
            );
        }
        Ok(CompileOutcome {
            success,
            logs: logs.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_project_dir_is_rejected() {
        let runner = BuildRunner::new();
        let err = runner.compile(Path::new("/non/existent/path")).unwrap_err();
        assert!(matches!(err, BuildError::InvalidProjectDir));
    }

    #[test]
    fn directory_without_build_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let runner = BuildRunner::new();
        let err = runner.compile(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::NotBuildProject));
    }

    #[test]
    fn build_tool_detection_prefers_maven() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        std::fs::write(dir.path().join("build.gradle"), "").unwrap();
        assert_eq!(
            BuildRunner::detect_tool(dir.path()).unwrap(),
            BuildTool::Maven
        );
    }

    #[test]
    fn gradle_kts_is_recognized() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.gradle.kts"), "").unwrap();
        assert_eq!(
            BuildRunner::detect_tool(dir.path()).unwrap(),
            BuildTool::Gradle
        );
    }
}
