//! Command line tests over synthetic assemblies

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use support::{demo_module, ImageBuilder, Target, ECMA_KEY, I4, PUBLIC, TYPE_PUBLIC, VOID};
use tempfile::tempdir;

const DEMO_SURFACE: &str = "T:Demo.A
F:Demo.A.X
F:Demo.A.Max
P:Demo.A.Count
M:Demo.A.Run(System.Int32,System.String)
T:Demo.A.Inner
T:Demo.Old
";

fn write_demo(dir: &Path) -> PathBuf {
    let path = dir.join("Demo.dll");
    demo_module().write(&path);
    path
}

fn api_surface() -> Command {
    Command::cargo_bin("api-surface").unwrap()
}

#[test]
fn test_help() {
    api_surface()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("print"))
        .stdout(predicate::str::contains("refs"));
}

#[test]
fn test_print_plain() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());

    api_surface()
        .args(["print"])
        .arg(&dll)
        .assert()
        .success()
        .stdout(DEMO_SURFACE);
}

#[test]
fn test_print_hidden_type_and_members() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());

    api_surface()
        .args(["print", "--hidden"])
        .arg(&dll)
        .assert()
        .success()
        .stdout(predicate::str::contains("T:Demo.Secret\nM:Demo.Secret.Go\n"));
}

#[test]
fn test_print_never_shows_non_public() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());

    api_surface()
        .args(["print", "--hidden"])
        .arg(&dll)
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo.A.Y").not())
        .stdout(predicate::str::contains("Impl").not())
        .stdout(predicate::str::contains("get_Count").not());
}

#[test]
fn test_print_kind_filter() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());

    api_surface()
        .args(["print", "--types"])
        .arg(&dll)
        .assert()
        .success()
        .stdout("T:Demo.A\nT:Demo.A.Inner\nT:Demo.Old\n");

    api_surface()
        .args(["print", "--fields", "--methods"])
        .arg(&dll)
        .assert()
        .success()
        .stdout("F:Demo.A.X\nF:Demo.A.Max\nM:Demo.A.Run(System.Int32,System.String)\n");
}

#[test]
fn test_print_csv_with_sidecar() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    fs::write(
        dir.path().join("Demo.xml"),
        r#"<?xml version="1.0"?>
<doc>
  <assembly><name>Demo</name></assembly>
  <members>
    <member name="F:Demo.A.X">
      <privilege>http://x</privilege>
      <feature>http://feature/network</feature>
      <since_tizen> 6 </since_tizen>
    </member>
  </members>
</doc>
"#,
    )
    .unwrap();

    api_surface()
        .args(["print", "-f", "csv"])
        .arg(&dll)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "\"F:Demo.A.X\",System.Int32,Demo.A,,,,,6,http://x,http://feature/network\n",
        ))
        .stdout(predicate::str::contains(
            "\"F:Demo.A.Max\",System.Int32,Demo.A,10,static,,,,,\n",
        ))
        .stdout(predicate::str::contains(
            "\"T:Demo.Old\",System.Object,,,,,obsolete,,,\n",
        ));
}

#[test]
fn test_print_json_to_file() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    let out = dir.path().join("api.json");

    api_surface()
        .args(["print", "-f", "json", "--category", "public", "-o"])
        .arg(&out)
        .arg(&dll)
        .assert()
        .success()
        .stdout("");

    let text = fs::read_to_string(&out).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&text).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 7);

    let run = &entries[4];
    assert_eq!(run["DocId"], "M:Demo.A.Run(System.Int32,System.String)");
    assert_eq!(run["Info"]["ReturnType"], "System.Void");
    assert_eq!(run["Info"]["DeclaringType"], "Demo.A");
    assert_eq!(run["Info"]["Namespace"], "Demo");
    assert_eq!(run["Info"]["Category"], "public");
    assert_eq!(run["Info"]["Since"], "none");
    assert_eq!(run["Info"]["IsStatic"], false);

    let old = &entries[6];
    assert_eq!(old["DocId"], "T:Demo.Old");
    assert_eq!(old["Info"]["BaseType"], "System.Object");
    assert_eq!(old["Info"]["IsObsolete"], true);
}

#[test]
fn test_print_directory_in_file_name_order() {
    let dir = tempdir().unwrap();
    write_demo(dir.path());

    let mut other = ImageBuilder::new("Alpha.dll", "Alpha");
    other.type_def("Alpha", "First", TYPE_PUBLIC);
    let run = other.method("Run", PUBLIC, VOID, &[I4]);
    other.obsolete(Target::Method(run));
    other.write(&dir.path().join("Alpha.dll"));
    fs::write(dir.path().join("notes.txt"), "not an assembly").unwrap();

    let expected = format!("T:Alpha.First\nM:Alpha.First.Run(System.Int32)\n{}", DEMO_SURFACE);
    api_surface()
        .args(["print"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_print_config_file_and_flag_precedence() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    let config = dir.path().join("api.yaml");
    fs::write(&config, "format: csv\nkinds: [types]\n").unwrap();

    api_surface()
        .args(["print", "-c"])
        .arg(&config)
        .arg(&dll)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("\"T:Demo.A\","));

    api_surface()
        .args(["print", "-f", "plain", "-c"])
        .arg(&config)
        .arg(&dll)
        .assert()
        .success()
        .stdout("T:Demo.A\nT:Demo.A.Inner\nT:Demo.Old\n");
}

#[test]
fn test_print_bad_config() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    let config = dir.path().join("api.yaml");
    fs::write(&config, "format: xml\n").unwrap();

    api_surface()
        .args(["print", "-c"])
        .arg(&config)
        .arg(&dll)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_print_missing_input() {
    let dir = tempdir().unwrap();

    api_surface()
        .args(["print"])
        .arg(dir.path().join("Missing.dll"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read module"));
}

#[test]
fn test_print_rejects_non_pe_input() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("Bogus.dll");
    fs::write(&bogus, "hello world").unwrap();

    api_surface()
        .args(["print"])
        .arg(&bogus)
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Failed to read module"));
}

#[test]
fn test_print_malformed_sidecar() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    fs::write(dir.path().join("Demo.xml"), "<doc><members><member").unwrap();

    api_surface()
        .args(["print", "-f", "csv"])
        .arg(&dll)
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Malformed documentation file"));
}

#[test]
fn test_print_plain_ignores_sidecar() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    fs::write(dir.path().join("Demo.xml"), "<doc><members><member").unwrap();

    api_surface()
        .args(["print"])
        .arg(&dll)
        .assert()
        .success()
        .stdout(DEMO_SURFACE);
}

#[test]
fn test_print_failure_keeps_previous_output() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("Bogus.dll");
    fs::write(&bogus, "hello world").unwrap();
    let out = dir.path().join("api.txt");
    fs::write(&out, "T:Previous.Run\n").unwrap();

    api_surface()
        .args(["print", "-o"])
        .arg(&out)
        .arg(&bogus)
        .assert()
        .failure();

    assert_eq!(fs::read_to_string(&out).unwrap(), "T:Previous.Run\n");
}

#[test]
fn test_print_overwrites_longer_previous_output() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());
    let out = dir.path().join("api.txt");
    fs::write(&out, DEMO_SURFACE.repeat(3)).unwrap();

    api_surface()
        .args(["print", "-o"])
        .arg(&out)
        .arg(&dll)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&out).unwrap(), DEMO_SURFACE);
}

#[test]
fn test_print_unwritable_output() {
    let dir = tempdir().unwrap();
    let dll = write_demo(dir.path());

    api_surface()
        .args(["print", "-o"])
        .arg(dir.path().join("missing").join("api.txt"))
        .arg(&dll)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot write output"));
}

#[test]
fn test_refs() {
    let dir = tempdir().unwrap();
    let dll = dir.path().join("Demo.dll");
    let mut module = demo_module();
    module.assembly_ref("Tizen.Core", (1, 0, 0, 0), &ECMA_KEY, true);
    module.assembly_ref("Demo.Common", (2, 1, 0, 0), &[], false);
    module.assembly_ref(
        "System.Runtime",
        (4, 2, 1, 0),
        &[0xb0, 0x3f, 0x5f, 0x7f, 0x11, 0xd5, 0x0a, 0x3a],
        false,
    );
    module.write(&dll);

    api_surface()
        .args(["refs"])
        .arg(&dll)
        .assert()
        .success()
        .stdout(
            "Demo.Common, Version=2.1.0.0, Culture=neutral, PublicKeyToken=null\n\
             System.Runtime, Version=4.2.1.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a\n\
             Tizen.Core, Version=1.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089\n",
        );

    api_surface()
        .args(["refs", "--name-only"])
        .arg(&dll)
        .assert()
        .success()
        .stdout("Demo.Common\nSystem.Runtime\nTizen.Core\n");
}

#[test]
fn test_refs_missing_input() {
    let dir = tempdir().unwrap();

    api_surface()
        .args(["refs"])
        .arg(dir.path().join("Missing.dll"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list references"));
}
