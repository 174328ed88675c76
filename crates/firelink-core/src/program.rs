// ── Program files ──
//
// A program is uploaded as `{name, event_list}` where `event_list` is the
// file's JSON content, untouched. The file is parsed locally first so a
// broken file never reaches the network.

use std::path::Path;

use serde_json::Value;

use crate::command::Command;
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramUpload {
    pub name: String,
    pub event_list: Value,
}

impl ProgramUpload {
    pub fn from_file_contents(file_name: &str, contents: &str) -> Result<Self, CoreError> {
        let event_list = serde_json::from_str(contents).map_err(|e| CoreError::MalformedInput {
            message: format!(
                "the program '{file_name}' is ill formed ({e}); check the file or choose a different one"
            ),
        })?;
        Ok(Self {
            name: file_name.to_owned(),
            event_list,
        })
    }

    /// Read and parse a program from disk; the upload name is the file name.
    pub fn read(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self::from_file_contents(&file_name, &contents)
    }

    pub fn into_command(self) -> Command {
        Command::Load {
            name: self.name,
            event_list: self.event_list,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_json_contents() {
        let upload =
            ProgramUpload::from_file_contents("show.json", r#"[{"t": 1.5, "fuse": "a0"}]"#)
                .unwrap();
        assert_eq!(upload.name, "show.json");
        assert!(upload.event_list.is_array());
    }

    #[test]
    fn ill_formed_file_is_malformed_input() {
        let err = ProgramUpload::from_file_contents("show.json", "[{").unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { .. }));
    }

    #[test]
    fn read_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finale.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"[]").unwrap();

        let upload = ProgramUpload::read(&path).unwrap();
        assert_eq!(upload.name, "finale.json");
        assert_eq!(
            upload.into_command(),
            Command::Load {
                name: "finale.json".into(),
                event_list: Value::Array(vec![]),
            }
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ProgramUpload::read(Path::new("/nonexistent/show.json")).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
