use assert_fs::prelude::*;
use fs_utils::delete::{self, DeleteOptions};
use fs_utils::{FsContext, NormalizedPath};
use predicates::prelude::*;
use pretty_assertions::assert_eq;

fn setup() -> (assert_fs::TempDir, FsContext) {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("project/keep.txt").write_str("keep").unwrap();
    temp.child("project/build/out.o").write_str("obj").unwrap();
    temp.child("project/build/deep/x.o").write_str("obj").unwrap();
    temp.child("project/logs/a.log").write_str("a").unwrap();
    temp.child("project/logs/b.log").write_str("b").unwrap();
    temp.child("project/.env").write_str("SECRET=1").unwrap();
    temp.child("outside.txt").write_str("outside").unwrap();

    let ctx = FsContext::new(temp.child("project").path()).unwrap();
    (temp, ctx)
}

fn strings(paths: &[NormalizedPath], ctx: &FsContext) -> Vec<String> {
    let prefix = format!("{}/", ctx.cwd());
    paths
        .iter()
        .map(|p| p.as_str().trim_start_matches(&prefix).to_string())
        .collect()
}

#[test]
fn test_delete_file_inside_cwd() {
    let (temp, ctx) = setup();

    assert!(delete::delete(&ctx, "keep.txt", &DeleteOptions::new()).unwrap());

    temp.child("project/keep.txt").assert(predicate::path::missing());
}

#[test]
fn test_delete_directory_recursively() {
    let (temp, ctx) = setup();

    assert!(delete::delete(&ctx, "build", &DeleteOptions::new()).unwrap());

    temp.child("project/build").assert(predicate::path::missing());
    temp.child("project/keep.txt").assert(predicate::path::exists());
}

#[test]
fn test_missing_target_returns_false() {
    let (_temp, ctx) = setup();
    assert!(!delete::delete(&ctx, "nope.txt", &DeleteOptions::new()).unwrap());
}

#[test]
fn test_cwd_itself_is_refused() {
    let (temp, ctx) = setup();

    assert!(!delete::delete(&ctx, ".", &DeleteOptions::new()).unwrap());
    assert!(!delete::delete(&ctx, ctx.cwd(), &DeleteOptions::new()).unwrap());

    temp.child("project").assert(predicate::path::is_dir());
}

#[test]
fn test_outside_cwd_is_refused() {
    let (temp, ctx) = setup();

    assert!(!delete::delete(&ctx, "../outside.txt", &DeleteOptions::new()).unwrap());

    temp.child("outside.txt").assert(predicate::path::exists());
}

#[test]
fn test_force_bypasses_cwd_policy() {
    let (temp, ctx) = setup();

    let removed = delete::delete(&ctx, "../outside.txt", &DeleteOptions::new().with_force(true)).unwrap();

    assert!(removed);
    temp.child("outside.txt").assert(predicate::path::missing());
}

#[test]
fn test_option_cwd_resolves_relative_targets() {
    let (temp, ctx) = setup();

    let options = DeleteOptions::new().with_cwd("logs");
    assert!(delete::delete(&ctx, "a.log", &options).unwrap());

    temp.child("project/logs/a.log").assert(predicate::path::missing());
    temp.child("project/logs/b.log").assert(predicate::path::exists());
}

#[cfg(unix)]
#[test]
fn test_symlink_is_removed_not_followed() {
    let (temp, ctx) = setup();
    std::os::unix::fs::symlink(
        temp.child("outside.txt").path(),
        temp.child("project/link.txt").path(),
    )
    .unwrap();

    assert!(delete::delete(&ctx, "link.txt", &DeleteOptions::new()).unwrap());

    temp.child("project/link.txt").assert(predicate::path::missing());
    temp.child("outside.txt").assert(predicate::str::contains("outside"));
}

#[test]
fn test_rmdir_removes_tree_without_checks() {
    let (temp, _ctx) = setup();
    let dir = NormalizedPath::new(temp.child("project/build").path());

    delete::rmdir(&dir).unwrap();

    temp.child("project/build").assert(predicate::path::missing());
}

#[test]
fn test_delete_many_reports_each_path() {
    let (temp, ctx) = setup();

    let report = delete::delete_many(
        &ctx,
        &["build", "build/**", "logs/*.log", "!logs/b.log"],
        &DeleteOptions::new(),
    )
    .unwrap();

    assert!(report.is_success());
    assert_eq!(strings(&report.deleted, &ctx), ["build", "logs/a.log"]);
    assert!(report.missing.is_empty());
    assert!(report.rejected.is_empty());

    temp.child("project/build").assert(predicate::path::missing());
    temp.child("project/logs/a.log").assert(predicate::path::missing());
    temp.child("project/logs/b.log").assert(predicate::path::exists());
    temp.child("project/keep.txt").assert(predicate::path::exists());
}

#[test]
fn test_delete_many_skips_dotfiles_unless_asked() {
    let (temp, ctx) = setup();

    let report = delete::delete_many(&ctx, &["*"], &DeleteOptions::new()).unwrap();
    assert!(!report.deleted.iter().any(|p| p.as_str().ends_with(".env")));
    temp.child("project/.env").assert(predicate::path::exists());

    let report = delete::delete_many(&ctx, &["*"], &DeleteOptions::new().with_dot(true)).unwrap();
    assert_eq!(strings(&report.deleted, &ctx), [".env"]);
    temp.child("project/.env").assert(predicate::path::missing());
}

#[test]
fn test_delete_many_with_no_matches() {
    let (_temp, ctx) = setup();
    let report = delete::delete_many(&ctx, &["*.nothing"], &DeleteOptions::new()).unwrap();
    assert!(report.deleted.is_empty());
    assert!(report.is_success());
}

#[test]
fn test_delete_many_rejects_the_base_when_it_is_outside() {
    let (temp, ctx) = setup();

    let options = DeleteOptions::new().with_cwd("..");
    let report = delete::delete_many(&ctx, &["outside.txt"], &options).unwrap();

    assert_eq!(report.rejected.len(), 1);
    assert!(report.deleted.is_empty());
    temp.child("outside.txt").assert(predicate::path::exists());
}

#[test]
fn test_delete_many_invalid_pattern_aborts() {
    let (temp, ctx) = setup();
    let result = delete::delete_many(&ctx, &["logs/*", "[z-a"], &DeleteOptions::new());
    assert!(result.is_err());
    temp.child("project/logs/a.log").assert(predicate::path::exists());
}

fn sibling_prefix_tree() -> (assert_fs::TempDir, FsContext) {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("project/out/x.txt").write_str("x").unwrap();
    temp.child("project/out/sub/y.txt").write_str("y").unwrap();
    temp.child("project/out.txt").write_str("out").unwrap();
    temp.child("project/out-cache/z.txt").write_str("z").unwrap();

    let ctx = FsContext::new(temp.child("project").path()).unwrap();
    (temp, ctx)
}

#[test]
fn test_delete_many_prunes_descendants_behind_a_sibling() {
    let (temp, ctx) = sibling_prefix_tree();

    let report = delete::delete_many(&ctx, &["**"], &DeleteOptions::new()).unwrap();

    assert!(report.is_success());
    assert_eq!(strings(&report.deleted, &ctx), ["out", "out-cache", "out.txt"]);
    assert!(report.missing.is_empty());
    temp.child("project/out").assert(predicate::path::missing());
    temp.child("project/out.txt").assert(predicate::path::missing());
}

mod async_delete {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_delete_async_file_and_directory() {
        let (temp, ctx) = setup();

        assert!(delete::delete_async(&ctx, "keep.txt", &DeleteOptions::new()).await.unwrap());
        assert!(delete::delete_async(&ctx, "build", &DeleteOptions::new()).await.unwrap());

        temp.child("project/keep.txt").assert(predicate::path::missing());
        temp.child("project/build").assert(predicate::path::missing());
    }

    #[tokio::test]
    async fn test_delete_async_policy_matches_sync() {
        let (temp, ctx) = setup();

        assert!(!delete::delete_async(&ctx, ".", &DeleteOptions::new()).await.unwrap());
        assert!(!delete::delete_async(&ctx, "../outside.txt", &DeleteOptions::new()).await.unwrap());
        assert!(!delete::delete_async(&ctx, "nope", &DeleteOptions::new()).await.unwrap());

        temp.child("outside.txt").assert(predicate::path::exists());
    }

    #[tokio::test]
    async fn test_rmdir_async() {
        let (temp, _ctx) = setup();
        let dir = NormalizedPath::new(temp.child("project/logs").path());

        delete::rmdir_async(&dir).await.unwrap();

        temp.child("project/logs").assert(predicate::path::missing());
    }

    #[tokio::test]
    async fn test_rmdir_async_missing_dir_is_an_error() {
        let (temp, _ctx) = setup();
        let dir = NormalizedPath::new(temp.child("project/nope").path());
        assert!(delete::rmdir_async(&dir).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_many_async_sorts_report() {
        let (temp, ctx) = setup();

        let report = delete::delete_many_async(
            &ctx,
            &["logs/*.log", "build", "keep.txt"],
            &DeleteOptions::new(),
        )
        .await
        .unwrap();

        assert!(report.is_success());
        assert_eq!(
            strings(&report.deleted, &ctx),
            ["build", "keep.txt", "logs/a.log", "logs/b.log"]
        );
        temp.child("project/logs").assert(predicate::path::is_dir());
        temp.child("project/build").assert(predicate::path::missing());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_many_async_prunes_descendants_behind_a_sibling() {
        for _ in 0..10 {
            let (temp, ctx) = sibling_prefix_tree();

            let report = delete::delete_many_async(&ctx, &["**"], &DeleteOptions::new())
                .await
                .unwrap();

            assert!(report.is_success(), "{:?}", report.failed);
            assert_eq!(strings(&report.deleted, &ctx), ["out", "out-cache", "out.txt"]);
            assert!(report.missing.is_empty());
            temp.child("project/out").assert(predicate::path::missing());
        }
    }
}

/// Failures that do not depend on permissions, so they hold when run as
/// root too.
#[cfg(target_os = "linux")]
mod failures {
    use super::*;
    use pretty_assertions::assert_eq;
    use fs_utils::Error;
    use std::fs;
    use std::path::Path;

    /// Bury `leaf.txt` under `root/name` deep enough that its full path
    /// exceeds PATH_MAX. Every rename names only short paths.
    fn deep_chain(root: &Path, name: &str) {
        let segment = "d".repeat(200);
        let chain = root.join(name);
        let staging = root.join("staging");
        fs::create_dir(&chain).unwrap();
        fs::write(chain.join("leaf.txt"), "x").unwrap();
        for _ in 0..24 {
            fs::create_dir(&staging).unwrap();
            fs::rename(&chain, staging.join(&segment)).unwrap();
            fs::rename(&staging, &chain).unwrap();
        }
    }

    #[test]
    fn test_delete_raises_io_error_with_path() {
        let (temp, ctx) = setup();
        deep_chain(&ctx.cwd().to_native(), "deep");

        let err = delete::delete(&ctx, "deep", &DeleteOptions::new()).unwrap_err();

        let deep = ctx.cwd().join("deep").to_native();
        assert!(
            matches!(err, Error::Io { ref path, .. } if path.starts_with(&deep)),
            "{err}"
        );
        temp.child("project/deep").assert(predicate::path::is_dir());
    }

    #[test]
    fn test_delete_many_continues_past_a_failure() {
        let (temp, ctx) = setup();
        deep_chain(&ctx.cwd().to_native(), "deep");

        let report = delete::delete_many(
            &ctx,
            &["deep", "keep.txt", "logs/*.log"],
            &DeleteOptions::new(),
        )
        .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ctx.cwd().join("deep"));
        assert!(matches!(report.failed[0].1, Error::Io { .. }));
        assert_eq!(
            strings(&report.deleted, &ctx),
            ["keep.txt", "logs/a.log", "logs/b.log"]
        );
        temp.child("project/keep.txt").assert(predicate::path::missing());
        temp.child("project/deep").assert(predicate::path::is_dir());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_many_async_continues_past_a_failure() {
        let (temp, ctx) = setup();
        deep_chain(&ctx.cwd().to_native(), "deep");

        let report = delete::delete_many_async(
            &ctx,
            &["deep", "keep.txt", "logs/*.log"],
            &DeleteOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ctx.cwd().join("deep"));
        assert!(matches!(report.failed[0].1, Error::Io { .. }));
        assert_eq!(
            strings(&report.deleted, &ctx),
            ["keep.txt", "logs/a.log", "logs/b.log"]
        );
        temp.child("project/logs/a.log").assert(predicate::path::missing());
        temp.child("project/deep").assert(predicate::path::is_dir());
    }
}
