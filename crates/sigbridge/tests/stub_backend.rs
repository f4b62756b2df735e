//! End-to-end tests against stub backends written as shell scripts.
//!
//! Each stub mimics the stream layout of the real programs: when signing,
//! the signature goes to stdout and the status stream to stderr; when
//! verifying, the status stream goes to stdout and console text to stderr.

#![cfg(unix)]

use sigbridge::{SigError, SigResult, SignatureCheck, SigningBackend};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PGP_SIG: &[u8] = b"-----BEGIN PGP SIGNATURE-----\n\nwsBcBAABCAAQBQJ\n-----END PGP SIGNATURE-----\n";
const X509_SIG: &[u8] = b"-----BEGIN SIGNED MESSAGE-----\nMIAGCSqGSIb3\n-----END SIGNED MESSAGE-----\n";

// Writing an executable while another test thread forks can leave the
// script busy (ETXTBSY), so stub creation and execution are serialized.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn stub(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn backend_with(openpgp: &str, x509: &str) -> SigningBackend {
    let mut backend = SigningBackend::new();
    backend.registry_mut().set_program("openpgp", openpgp).unwrap();
    backend.registry_mut().set_program("x509", x509).unwrap();
    backend
}

fn openpgp_backend(program: &str) -> SigningBackend {
    backend_with(program, "/nonexistent/gpgsm")
}

// ---------------------------------------------------------------------------
// signing
// ---------------------------------------------------------------------------

#[test]
fn sign_returns_backend_stdout() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"[ "$1" = "--status-fd=2" ] && [ "$2" = "-bsau" ] && [ "$3" = "Alice" ] || exit 3
[ "$(cat)" = "hello" ] || exit 4
printf 'SIGDATA'
printf '[GNUPG:] SIG_CREATED \n' >&2"#,
    );

    let signature = openpgp_backend(&gpg).sign_buffer(b"hello\n", "Alice").unwrap();
    assert_eq!(signature, b"SIGDATA");
}

#[test]
fn sign_strips_carriage_returns() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
printf 'sig line 1\r\nsig line 2\r\n\r\nend'
printf '[GNUPG:] KEY_CONSIDERED ABCD 2\n[GNUPG:] SIG_CREATED D 1 8 00 1704067200 ABCD\n' >&2"#,
    );

    let signature = openpgp_backend(&gpg).sign_buffer(b"data", "KEY").unwrap();
    assert_eq!(signature, b"sig line 1\nsig line 2\n\nend");
}

#[test]
fn sign_uses_active_format_program() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpgsm = stub(
        dir.path(),
        "gpgsm",
        r#"cat >/dev/null
printf 'CMS'
printf '[GNUPG:] SIG_CREATED \n' >&2"#,
    );

    let mut backend = backend_with("/nonexistent/gpg", &gpgsm);
    backend.apply_config("gpg.format", Some("x509")).unwrap();
    assert_eq!(backend.sign_buffer(b"data", "KEY").unwrap(), b"CMS");
}

#[test]
fn sign_without_sig_created_fails() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
printf 'SIGDATA'
printf '[GNUPG:] KEY_CONSIDERED ABCD 2\ngpg: SIG_CREATED \n' >&2"#,
    );

    let err = openpgp_backend(&gpg).sign_buffer(b"data", "KEY").unwrap_err();
    assert!(matches!(err, SigError::SigningFailed { .. }));
}

#[test]
fn sign_nonzero_exit_fails_even_with_sig_created() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
printf 'SIGDATA'
printf '[GNUPG:] SIG_CREATED \n' >&2
exit 2"#,
    );

    let err = openpgp_backend(&gpg).sign_buffer(b"data", "KEY").unwrap_err();
    assert!(matches!(err, SigError::SigningFailed { .. }));
}

#[test]
fn sign_backend_exiting_early_is_an_error_not_a_crash() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"echo "gpg: skipped \"$3\": No secret key" >&2
exit 2"#,
    );

    let payload = vec![b'x'; 4 << 20];
    let err = openpgp_backend(&gpg)
        .sign_buffer(&payload, "unknown")
        .unwrap_err();
    assert!(matches!(err, SigError::SigningFailed { .. }));
}

#[test]
fn sign_large_payload_does_not_deadlock() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    // Echo the payload back as the "signature" while it is still being written.
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat
printf '[GNUPG:] SIG_CREATED \n' >&2"#,
    );

    let payload: Vec<u8> = (0..(2usize << 20)).map(|i| b'a' + (i % 26) as u8).collect();
    let signature = openpgp_backend(&gpg).sign_buffer(&payload, "KEY").unwrap();
    assert_eq!(signature, payload);
}

// ---------------------------------------------------------------------------
// verification
// ---------------------------------------------------------------------------

#[test]
fn verify_good_signature() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"[ "$1" = "--keyid-format=long" ] && [ "$2" = "--status-fd=1" ] && [ "$3" = "--verify" ] && [ "$5" = "-" ] || exit 3
[ "$(cat)" = "payload" ] || exit 4
cat "$4" >&2
printf '[GNUPG:] GOODSIG ABCD1234 Alice <alice@example.com>\n'"#,
    );

    let backend = openpgp_backend(&gpg);
    let (ok, check) = backend.check_signature(b"payload\n", PGP_SIG).unwrap();
    assert!(ok);
    assert_eq!(check.result, SigResult::Good);
    assert_eq!(check.key.as_deref(), Some("ABCD1234"));
    assert_eq!(check.signer.as_deref(), Some("Alice <alice@example.com>"));
    assert_eq!(check.payload.as_deref(), Some(&b"payload\n"[..]));
    assert_eq!(check.output.as_deref(), Some(PGP_SIG));
    assert_eq!(
        check.status.as_deref(),
        Some(&b"[GNUPG:] GOODSIG ABCD1234 Alice <alice@example.com>\n"[..])
    );

    assert!(backend.verify_quick(b"payload\n", PGP_SIG).unwrap());
}

#[test]
fn verify_removes_temporary_signature_file() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
[ -f "$4" ] || exit 5
echo "$4" >&2
exit 1"#,
    );

    let (ok, check) = openpgp_backend(&gpg)
        .check_signature(b"payload", PGP_SIG)
        .unwrap();
    assert!(!ok);
    assert_eq!(check.result, SigResult::None);

    let output = check.output.unwrap();
    let sig_path = String::from_utf8(output).unwrap();
    let sig_path = Path::new(sig_path.trim());
    assert!(sig_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(".sigbridge_vtag_tmp"));
    assert!(!sig_path.exists());
}

#[test]
fn verify_failure_without_output_skips_parsing() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
printf '[GNUPG:] GOODSIG ABCD Someone\n'
exit 2"#,
    );

    let (ok, check) = openpgp_backend(&gpg)
        .check_signature(b"payload", PGP_SIG)
        .unwrap();
    assert!(!ok);
    assert_eq!(check, SignatureCheck::new());
}

#[test]
fn verify_nonzero_exit_is_not_verified_despite_goodsig() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
printf '[GNUPG:] GOODSIG ABCD Someone\n'
echo 'gpg: something went wrong' >&2
exit 1"#,
    );

    let backend = openpgp_backend(&gpg);
    let (ok, check) = backend.check_signature(b"payload", PGP_SIG).unwrap();
    assert!(!ok);
    assert_eq!(check.result, SigResult::Good);
    assert!(!backend.verify_quick(b"payload", PGP_SIG).unwrap());
}

#[test]
fn verify_untrusted_key_is_accepted() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
echo 'gpg: WARNING: This key is not certified with a trusted signature!' >&2
printf '[GNUPG:] NEWSIG\n[GNUPG:] GOODSIG ABCD Bob <bob@example.com>\n[GNUPG:] TRUST_UNDEFINED 0 pgp\n'"#,
    );

    let backend = openpgp_backend(&gpg);
    let (ok, check) = backend.check_signature(b"payload", PGP_SIG).unwrap();
    assert!(ok);
    assert_eq!(check.result, SigResult::Untrusted);
    assert!(backend.verify_quick(b"payload", PGP_SIG).unwrap());
}

#[test]
fn verify_untrusted_without_goodsig_fails_quick_check() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
printf '[GNUPG:] TRUST_NEVER\n'"#,
    );

    let backend = openpgp_backend(&gpg);
    let (ok, check) = backend.check_signature(b"payload", PGP_SIG).unwrap();
    assert!(ok);
    assert_eq!(check.result, SigResult::Untrusted);
    assert!(!backend.verify_quick(b"payload", PGP_SIG).unwrap());
}

#[test]
fn verify_multiple_signatures_rejected() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"cat >/dev/null
echo 'gpg: Good signature' >&2
printf '[GNUPG:] GOODSIG AAAA Alice\n[GNUPG:] VALIDSIG F1 2024-01-01 1 0 4 0 1 10 00 P1\n[GNUPG:] GOODSIG BBBB Mallory\n[GNUPG:] VALIDSIG F2 2024-01-01 1 0 4 0 1 10 00 P2\n'"#,
    );

    let (ok, check) = openpgp_backend(&gpg)
        .check_signature(b"payload", PGP_SIG)
        .unwrap();
    assert!(!ok);
    assert_eq!(check.result, SigResult::Error);
    assert!(check.key.is_none());
    assert!(check.signer.is_none());
    assert!(check.fingerprint.is_none());
    assert!(check.primary_key_fingerprint.is_none());
}

#[test]
fn verify_picks_x509_backend_from_signature_header() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpgsm = stub(
        dir.path(),
        "gpgsm",
        r#"[ "$1" = "--status-fd=1" ] && [ "$2" = "--verify" ] && [ "$4" = "-" ] || exit 3
cat >/dev/null
echo 'gpgsm: Good signature' >&2
printf '[GNUPG:] GOODSIG 0x1234 /CN=Carol\n[GNUPG:] VALIDSIG FPRX 20240101T000000 20240101T000000 0 0 0 1 8 00 FPRX\n'"#,
    );

    let (ok, check) = backend_with("/nonexistent/gpg", &gpgsm)
        .check_signature(b"payload", X509_SIG)
        .unwrap();
    assert!(ok);
    assert_eq!(check.signer.as_deref(), Some("/CN=Carol"));
    assert_eq!(check.fingerprint.as_deref(), Some("FPRX"));
    assert_eq!(check.primary_key_fingerprint.as_deref(), Some("FPRX"));
}

#[test]
fn verify_backend_exiting_early_on_large_payload() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(dir.path(), "gpg", "exit 2");

    let payload = vec![b'x'; 4 << 20];
    let (ok, check) = openpgp_backend(&gpg)
        .check_signature(&payload, PGP_SIG)
        .unwrap();
    assert!(!ok);
    assert_eq!(check.result, SigResult::None);
}

#[test]
fn embedded_signature_split_and_verified() {
    let _guard = lock();
    let dir = tempfile::tempdir().unwrap();
    let gpg = stub(
        dir.path(),
        "gpg",
        r#"[ "$(cat)" = "object abc" ] || exit 4
echo 'gpg: Good signature' >&2
printf '[GNUPG:] GOODSIG ABCD Someone\n'"#,
    );

    let mut signed = b"object abc\n".to_vec();
    signed.extend_from_slice(PGP_SIG);

    let backend = openpgp_backend(&gpg);
    let offset = backend.find_signature_offset(&signed);
    let (payload, signature) = signed.split_at(offset);
    assert_eq!(signature, PGP_SIG);
    assert!(backend.verify_quick(payload, signature).unwrap());
}
