use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use serde_sarif::sarif::{Artifact, ArtifactLocation, ArtifactRoles};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::classfile::load_class;
use crate::error::LoadError;
use crate::ir::Class;

/// Classes and artifacts discovered by a scan.
#[derive(Default)]
pub struct ScanOutput {
    /// Classes to analyze.
    pub classes: Vec<Class>,
    /// Classes available for type resolution only.
    pub classpath_classes: Vec<Class>,
    pub artifacts: Vec<Artifact>,
    /// Units that could not be loaded. The rest of the scan still ran.
    pub failures: Vec<LoadError>,
    pub class_count: usize,
}

impl ScanOutput {
    fn record(&mut self, class: Class, is_target: bool) {
        self.class_count += 1;
        if is_target {
            self.classes.push(class);
        } else {
            self.classpath_classes.push(class);
        }
    }

    fn fail(&mut self, error: LoadError) {
        warn!(unit = error.unit(), error = %error, "skipping unit");
        self.failures.push(error);
    }
}

pub fn scan_inputs(input: &Path, classpath: &[PathBuf]) -> Result<ScanOutput> {
    let mut output = ScanOutput::default();

    scan_path(input, true, true, true, &mut output)?;

    // Keep deterministic ordering by sorting classpath entries and directory listings.
    let mut classpath_entries = classpath.to_vec();
    classpath_entries.sort_by(|a, b| path_key(a).cmp(&path_key(b)));

    for entry in classpath_entries {
        scan_path(&entry, false, false, true, &mut output)?;
    }

    debug!(
        targets = output.classes.len(),
        classpath = output.classpath_classes.len(),
        failures = output.failures.len(),
        "scan finished"
    );
    Ok(output)
}

fn scan_path(
    path: &Path,
    is_target: bool,
    is_input: bool,
    strict: bool,
    output: &mut ScanOutput,
) -> Result<()> {
    if path.is_dir() {
        return scan_dir(path, is_target, output);
    }

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    let roles = if is_input {
        Some(vec![serde_json::to_value(ArtifactRoles::AnalysisTarget)
            .context("serialize artifact role")?])
    } else {
        None
    };

    match extension {
        "class" => {
            scan_class_file(path, is_target, roles, output);
            Ok(())
        }
        "jar" => {
            scan_jar_file(path, is_target, roles, output);
            Ok(())
        }
        _ => {
            if strict {
                anyhow::bail!("unsupported input file: {}", path.display())
            } else {
                Ok(())
            }
        }
    }
}

fn scan_dir(path: &Path, is_target: bool, output: &mut ScanOutput) -> Result<()> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("failed to read directory {}", path.display()))?
    {
        let entry = entry.with_context(|| format!("failed to read entry under {}", path.display()))?;
        entries.push(entry.path());
    }

    entries.sort_by(|a, b| path_key(a).cmp(&path_key(b)));

    for entry in entries {
        if entry.is_dir() {
            scan_dir(&entry, is_target, output)?;
        } else {
            scan_path(&entry, is_target, false, false, output)?;
        }
    }

    Ok(())
}

fn scan_class_file(path: &Path, is_target: bool, roles: Option<Vec<Value>>, output: &mut ScanOutput) {
    let unit = path_to_uri(path);
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(source) => {
            output.fail(LoadError::Io { unit, source });
            return;
        }
    };
    match load_class(&unit, &data) {
        Ok(class) => {
            output.record(class, is_target);
            push_artifact(unit, data.len() as u64, None, roles, &mut output.artifacts);
        }
        Err(error) => output.fail(error),
    }
}

/// An unreadable archive or entry is recorded as a failure; the scan goes on.
fn scan_jar_file(
    path: &Path,
    is_target: bool,
    roles: Option<Vec<Value>>,
    output: &mut ScanOutput,
) {
    let unit = path_to_uri(path);
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(source) => {
            output.fail(LoadError::Io { unit, source });
            return;
        }
    };
    let jar_len = match file.metadata() {
        Ok(metadata) => metadata.len(),
        Err(source) => {
            output.fail(LoadError::Io { unit, source });
            return;
        }
    };
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(source) => {
            output.fail(LoadError::Archive { unit, source });
            return;
        }
    };

    let jar_index = push_path_artifact(path, roles, jar_len, None, &mut output.artifacts);

    let mut entry_names = Vec::new();
    for index in 0..archive.len() {
        let entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(source) => {
                output.fail(LoadError::Archive {
                    unit: unit.clone(),
                    source,
                });
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if name.ends_with(".class") && !name.ends_with("module-info.class") {
            entry_names.push(name);
        }
    }

    entry_names.sort();

    for name in entry_names {
        let unit = jar_entry_uri(path, &name);
        let mut entry = match archive.by_name(&name) {
            Ok(entry) => entry,
            Err(source) => {
                output.fail(LoadError::Archive { unit, source });
                continue;
            }
        };
        let mut data = Vec::new();
        if let Err(source) = entry.read_to_end(&mut data) {
            output.fail(LoadError::Io { unit, source });
            continue;
        }
        match load_class(&unit, &data) {
            Ok(class) => {
                output.record(class, is_target);
                push_artifact(unit, entry.size(), Some(jar_index), None, &mut output.artifacts);
            }
            Err(error) => output.fail(error),
        }
    }
}

/// Push a path-based artifact and return its index for parent linkage (e.g., JAR entries).
fn push_path_artifact(
    path: &Path,
    roles: Option<Vec<Value>>,
    len: u64,
    parent_index: Option<i64>,
    artifacts: &mut Vec<Artifact>,
) -> i64 {
    push_artifact(path_to_uri(path), len, parent_index, roles, artifacts)
}

fn push_artifact(
    uri: String,
    len: u64,
    parent_index: Option<i64>,
    roles: Option<Vec<Value>>,
    artifacts: &mut Vec<Artifact>,
) -> i64 {
    let location = ArtifactLocation::builder().uri(uri).build();
    let artifact = match (parent_index, roles) {
        (Some(parent_index), Some(roles)) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .parent_index(parent_index)
            .roles(roles)
            .build(),
        (Some(parent_index), None) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .parent_index(parent_index)
            .build(),
        (None, Some(roles)) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .roles(roles)
            .build(),
        (None, None) => Artifact::builder()
            .location(location)
            .length(len as i64)
            .build(),
    };
    let index = artifacts.len() as i64;
    artifacts.push(artifact);
    index
}

fn path_to_uri(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn jar_entry_uri(jar_path: &Path, entry_name: &str) -> String {
    format!("jar:{}!/{}", jar_path.to_string_lossy(), entry_name)
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::empty_class_bytes;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
        let file = fs::File::create(path).expect("create jar");
        let mut jar = ZipWriter::new(file);
        for (name, data) in entries {
            jar.start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            jar.write_all(data).expect("write entry");
        }
        jar.finish().expect("finish jar");
    }

    #[test]
    fn scan_inputs_records_invalid_class_file_as_failure() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let class_path = temp_dir.path().join("bad.class");
        fs::write(&class_path, b"nope").expect("write test class");

        let result = scan_inputs(&class_path, &[]).expect("scan continues");

        assert_eq!(0, result.class_count);
        assert!(result.artifacts.is_empty());
        assert_eq!(1, result.failures.len());
        assert!(result.failures[0].unit().ends_with("bad.class"));
    }

    #[test]
    fn scan_inputs_accepts_valid_class_file() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let class_path = temp_dir.path().join("Sample.class");
        fs::write(&class_path, empty_class_bytes("com/example/Sample")).expect("write class");

        let result = scan_inputs(&class_path, &[]).expect("scan class");

        assert_eq!(result.class_count, 1);
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!("com/example/Sample", result.classes[0].name);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn directory_scan_is_sorted_and_keeps_going_after_bad_units() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let nested = temp_dir.path().join("com").join("example");
        fs::create_dir_all(&nested).expect("create package dir");
        fs::write(nested.join("B.class"), empty_class_bytes("com/example/B")).expect("write B");
        fs::write(nested.join("A.class"), empty_class_bytes("com/example/A")).expect("write A");
        fs::write(nested.join("Broken.class"), b"\xca\xfe").expect("write broken");
        fs::write(nested.join("notes.txt"), b"ignored").expect("write text");

        let result = scan_inputs(temp_dir.path(), &[]).expect("scan directory");
        let names: Vec<&str> = result.classes.iter().map(|class| class.name.as_str()).collect();

        assert_eq!(vec!["com/example/A", "com/example/B"], names);
        assert_eq!(1, result.failures.len());
    }

    #[test]
    fn jar_entries_link_to_their_archive_and_classpath_is_not_a_target() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let app_jar = temp_dir.path().join("app.jar");
        let lib_jar = temp_dir.path().join("lib.jar");
        write_jar(
            &app_jar,
            &[
                ("com/example/App.class", empty_class_bytes("com/example/App")),
                ("module-info.class", b"skipped".to_vec()),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()),
            ],
        );
        write_jar(
            &lib_jar,
            &[("org/lib/Util.class", empty_class_bytes("org/lib/Util"))],
        );

        let result = scan_inputs(&app_jar, &[lib_jar]).expect("scan jars");

        assert_eq!(2, result.class_count);
        assert_eq!("com/example/App", result.classes[0].name);
        assert_eq!("org/lib/Util", result.classpath_classes[0].name);
        let first_uri = result
            .artifacts
            .first()
            .and_then(|artifact| artifact.location.as_ref())
            .and_then(|location| location.uri.as_ref())
            .cloned()
            .expect("artifact uri");
        assert!(first_uri.ends_with("app.jar"));
        assert_eq!(Some(0), result.artifacts[1].parent_index);
    }

    #[test]
    fn corrupt_jar_is_a_failure_not_an_abort() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        fs::write(
            temp_dir.path().join("Good.class"),
            empty_class_bytes("com/example/Good"),
        )
        .expect("write class");
        fs::write(temp_dir.path().join("broken.jar"), b"not a zip").expect("write jar");

        let result = scan_inputs(temp_dir.path(), &[]).expect("scan continues");

        assert_eq!(1, result.class_count);
        assert_eq!("com/example/Good", result.classes[0].name);
        assert_eq!(1, result.failures.len());
        assert!(matches!(result.failures[0], LoadError::Archive { .. }));
        assert!(result.failures[0].unit().ends_with("broken.jar"));
    }

    #[test]
    fn corrupt_jar_on_the_classpath_does_not_abort_the_scan() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let class_path = temp_dir.path().join("App.class");
        fs::write(&class_path, empty_class_bytes("com/example/App")).expect("write class");
        let lib_jar = temp_dir.path().join("lib.jar");
        fs::write(&lib_jar, b"not a zip").expect("write jar");

        let result = scan_inputs(&class_path, &[lib_jar]).expect("scan continues");

        assert_eq!(1, result.classes.len());
        assert!(result.classpath_classes.is_empty());
        assert_eq!(1, result.failures.len());
    }

    #[test]
    fn unsupported_input_file_is_an_error() {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, b"text").expect("write file");

        assert!(scan_inputs(&path, &[]).is_err());
    }
}
