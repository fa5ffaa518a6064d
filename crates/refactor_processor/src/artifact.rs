use app_model::{package_of, simple_name_of};
use serde::{Deserialize, Serialize};

/// Placeholder for the target microservice root. Substituted by the
/// downstream assembly step that copies artifacts into each service.
pub const MS_ROOT_PLACEHOLDER: &str = "{ms_root}";

/// One generated artifact ready to be written to disk. Never mutated
/// after creation; a correction produces a new instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub file_name: String,
    /// Path template rooted at [`MS_ROOT_PLACEHOLDER`].
    pub file_path: String,
    pub content: String,
}

impl GeneratedFile {
    /// Artifact for a Java class, placed under the Maven source root
    /// according to its package.
    pub fn java_class(full_class_name: &str, content: impl Into<String>) -> Self {
        let simple = simple_name_of(full_class_name);
        let package_path = package_of(full_class_name).replace('.', "/");
        let file_name = format!("{simple}.java");
        Self {
            file_path: format!("{MS_ROOT_PLACEHOLDER}/src/main/java/{package_path}/{file_name}"),
            file_name,
            content: content.into(),
        }
    }

    /// Artifact for a proto file, placed under the proto source root.
    pub fn proto(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            file_path: format!("{MS_ROOT_PLACEHOLDER}/src/main/proto/{file_name}"),
            file_name,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_class_path_follows_the_package() {
        let file = GeneratedFile::java_class("com.app.generated.server.OrderImpl", "class X {}");
        assert_eq!(file.file_name, "OrderImpl.java");
        assert_eq!(
            file.file_path,
            "{ms_root}/src/main/java/com/app/generated/server/OrderImpl.java"
        );
    }

    #[test]
    fn proto_files_land_under_the_proto_root() {
        let file = GeneratedFile::proto("order.proto", "syntax = \"proto3\";");
        assert_eq!(file.file_path, "{ms_root}/src/main/proto/order.proto");
    }
}
