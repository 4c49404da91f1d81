use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("sfm"));
    cmd.env_remove("SFM_PASSWORD").env_remove("SFM_LOGIN_FILE");
    cmd
}

fn fast_argon(cmd: &mut Command) -> &mut Command {
    cmd.arg("--argon-mem").arg("8192").arg("--argon-time").arg("1")
}

#[test]
fn create_then_open_succeeds() {
    let dir = tempdir().unwrap();
    let vault = dir.path().join("v.sfm");

    // create
    let mut cmd = bin();
    cmd.env("SFM_PASSWORD", "hunter2")
        .arg("create")
        .arg(&vault)
        .arg("1");
    fast_argon(&mut cmd)
        .assert()
        .success()
        .stdout(predicate::str::contains("Container created"));

    // header + 1 MiB payload + tag
    assert_eq!(fs::metadata(&vault).unwrap().len(), 91 + 1_048_576 + 16);

    // open
    bin()
        .env("SFM_PASSWORD", "hunter2")
        .arg("open")
        .arg(&vault)
        .assert()
        .success()
        .stdout(predicate::str::contains("Password correct"));
}

#[test]
fn open_with_wrong_password_is_denied() {
    let dir = tempdir().unwrap();
    let vault = dir.path().join("v.sfm");

    let mut cmd = bin();
    cmd.env("SFM_PASSWORD", "hunter2")
        .arg("create")
        .arg(&vault)
        .arg("1");
    fast_argon(&mut cmd).assert().success();

    bin()
        .env("SFM_PASSWORD", "wrong")
        .arg("open")
        .arg(&vault)
        .assert()
        .success()
        .stderr(predicate::str::contains("Access Denied"));
}

#[test]
fn encrypt_decrypt_roundtrip() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    let sealed = dir.path().join("notes.sfm");
    let restored = dir.path().join("notes.out");

    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    fs::write(&source, &content).unwrap();

    // enc
    let mut cmd = bin();
    cmd.env("SFM_PASSWORD", "pw")
        .arg("enc")
        .arg(&source)
        .arg(&sealed);
    fast_argon(&mut cmd)
        .assert()
        .success()
        .stdout(predicate::str::contains("File encrypted successfully"));

    assert_eq!(
        fs::metadata(&sealed).unwrap().len(),
        91 + content.len() as u64 + 16
    );

    // dec
    bin()
        .env("SFM_PASSWORD", "pw")
        .arg("dec")
        .arg(&sealed)
        .arg(&restored)
        .assert()
        .success()
        .stdout(predicate::str::contains("File decrypted successfully"));

    assert_eq!(fs::read(&restored).unwrap(), content);
}

#[test]
fn decrypt_with_wrong_password_fails() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    let sealed = dir.path().join("notes.sfm");
    let restored = dir.path().join("notes.out");

    fs::write(&source, b"attack at dawn").unwrap();

    let mut cmd = bin();
    cmd.env("SFM_PASSWORD", "pw")
        .arg("enc")
        .arg(&source)
        .arg(&sealed);
    fast_argon(&mut cmd).assert().success();

    bin()
        .env("SFM_PASSWORD", "other")
        .arg("dec")
        .arg(&sealed)
        .arg(&restored)
        .assert()
        .success()
        .stderr(predicate::str::contains("wrong password or corrupted file"));

    assert!(!restored.exists());
}

#[test]
fn decrypt_rejects_tampered_container() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    let sealed = dir.path().join("notes.sfm");
    let restored = dir.path().join("notes.out");

    fs::write(&source, vec![0x42u8; 4096]).unwrap();

    let mut cmd = bin();
    cmd.env("SFM_PASSWORD", "pw")
        .arg("enc")
        .arg(&source)
        .arg(&sealed);
    fast_argon(&mut cmd).assert().success();

    let mut bytes = fs::read(&sealed).unwrap();
    bytes[91 + 100] ^= 0x01;
    fs::write(&sealed, &bytes).unwrap();

    bin()
        .env("SFM_PASSWORD", "pw")
        .arg("dec")
        .arg(&sealed)
        .arg(&restored)
        .assert()
        .success()
        .stderr(predicate::str::contains("wrong password or corrupted file"));

    assert!(!restored.exists());
}

#[test]
fn decrypt_rejects_bad_magic() {
    let dir = tempdir().unwrap();
    let bogus = dir.path().join("bogus.sfm");
    let restored = dir.path().join("bogus.out");

    fs::write(&bogus, vec![0x11u8; 500]).unwrap();

    bin()
        .env("SFM_PASSWORD", "pw")
        .arg("dec")
        .arg(&bogus)
        .arg(&restored)
        .assert()
        .success()
        .stderr(predicate::str::contains("invalid container format"));
}

#[test]
fn del_wipes_file_after_confirmation() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("secret.bin");
    fs::write(&target, vec![0xAAu8; 8192]).unwrap();

    bin()
        .arg("del")
        .arg(&target)
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("securely wiped and deleted"));

    assert!(!target.exists());
}

#[test]
fn del_is_cancelled_without_confirmation() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("secret.bin");
    fs::write(&target, b"keep me").unwrap();

    bin()
        .arg("del")
        .arg(&target)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Operation cancelled"));

    assert!(target.exists());
}

#[test]
fn missing_arguments_exit_with_usage_error() {
    bin().assert().failure().code(1);
    bin().arg("create").assert().failure().code(1);
}

#[test]
fn login_gate_registers_then_guards() {
    let dir = tempdir().unwrap();
    let vault = dir.path().join("v.sfm");
    let login = dir.path().join("login.hash");

    // first use registers the login credential
    let mut cmd = bin();
    cmd.env("SFM_PASSWORD", "hunter2")
        .arg("--login")
        .arg(&login)
        .arg("create")
        .arg(&vault)
        .arg("1");
    fast_argon(&mut cmd)
        .assert()
        .success()
        .stdout(predicate::str::contains("Master password initialized"));

    assert!(login.exists());

    // matching login is accepted
    bin()
        .env("SFM_PASSWORD", "hunter2")
        .arg("--login")
        .arg(&login)
        .arg("open")
        .arg(&vault)
        .assert()
        .success()
        .stdout(predicate::str::contains("[Auth] Success"));

    // wrong login refuses the operation
    bin()
        .env("SFM_PASSWORD", "letmein")
        .arg("--login")
        .arg(&login)
        .arg("open")
        .arg(&vault)
        .assert()
        .success()
        .stderr(predicate::str::contains("login failed"));
}
