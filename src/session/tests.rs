//! Checkout Session Tests
//!
//! Covers session id issuance, range validation, and splice correctness
//! including edits that grow or shrink the file.

#[cfg(test)]
mod tests {
    use crate::session::manager::SessionManager;
    use tempfile::TempDir;

    async fn manager_with(files: &[(&str, &str)]) -> (TempDir, SessionManager) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            tokio::fs::write(dir.path().join(name), content)
                .await
                .expect("Failed to write fixture file");
        }
        let manager = SessionManager::new(dir.path().to_path_buf());
        (dir, manager)
    }

    #[tokio::test]
    async fn test_session_ids_are_monotonic() {
        let (_dir, manager) = manager_with(&[]).await;

        let a = manager.new_session_id();
        let b = manager.new_session_id();
        let c = manager.new_session_id();
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn test_open_returns_exact_range() {
        let (_dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        let data = manager.open("report.txt", 2, 5, id, 1).await.unwrap();

        assert_eq!(data, b"CDE");
        assert_eq!(manager.open_count(), 1);

        let session = manager.take(id).unwrap();
        assert_eq!(session.version_at_open, 1);
        assert_eq!((session.start, session.end), (2, 5));
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_ranges() {
        let (_dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        // end beyond file size
        assert!(manager.open("report.txt", 2, 11, 1, 1).await.is_err());
        // empty range
        assert!(manager.open("report.txt", 5, 5, 2, 1).await.is_err());
        // inverted range
        assert!(manager.open("report.txt", 6, 3, 3, 1).await.is_err());
        // missing file
        assert!(manager.open("absent.txt", 0, 1, 4, 1).await.is_err());

        assert_eq!(manager.open_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_session_id_is_rejected() {
        let (_dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        manager.open("report.txt", 0, 3, id, 1).await.unwrap();

        let second = manager.open("report.txt", 3, 6, id, 1).await;
        assert!(second.is_err());
        assert_eq!(manager.open_count(), 1);
    }

    #[tokio::test]
    async fn test_take_consumes_session_once() {
        let (_dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        manager.open("report.txt", 0, 3, id, 1).await.unwrap();

        assert!(manager.take(id).is_some());
        assert!(manager.take(id).is_none());
    }

    #[tokio::test]
    async fn test_splice_same_length() {
        let (dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        manager.open("report.txt", 2, 5, id, 1).await.unwrap();
        let session = manager.take(id).unwrap();

        manager.splice(&session, b"XYZ").await.unwrap();

        let result = tokio::fs::read_to_string(dir.path().join("report.txt"))
            .await
            .unwrap();
        assert_eq!(result, "ABXYZFGHIJ");
    }

    #[tokio::test]
    async fn test_splice_grows_file() {
        let (dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        manager.open("report.txt", 2, 5, id, 1).await.unwrap();
        let session = manager.take(id).unwrap();

        manager.splice(&session, b"LONGER-REPLACEMENT").await.unwrap();

        let result = tokio::fs::read_to_string(dir.path().join("report.txt"))
            .await
            .unwrap();
        assert_eq!(result, "ABLONGER-REPLACEMENTFGHIJ");
    }

    #[tokio::test]
    async fn test_splice_shrinks_file() {
        let (dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        manager.open("report.txt", 2, 8, id, 1).await.unwrap();
        let session = manager.take(id).unwrap();

        manager.splice(&session, b"-").await.unwrap();

        let result = tokio::fs::read_to_string(dir.path().join("report.txt"))
            .await
            .unwrap();
        assert_eq!(result, "AB-IJ");
    }

    #[tokio::test]
    async fn test_splice_at_file_boundaries() {
        let (dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        // Whole-file replacement.
        let id = manager.new_session_id();
        manager.open("report.txt", 0, 10, id, 1).await.unwrap();
        let session = manager.take(id).unwrap();
        manager.splice(&session, b"fresh").await.unwrap();

        let result = tokio::fs::read_to_string(dir.path().join("report.txt"))
            .await
            .unwrap();
        assert_eq!(result, "fresh");
    }

    #[tokio::test]
    async fn test_splice_leaves_no_temp_files() {
        let (dir, manager) = manager_with(&[("report.txt", "ABCDEFGHIJ")]).await;

        let id = manager.new_session_id();
        manager.open("report.txt", 0, 1, id, 1).await.unwrap();
        let session = manager.take(id).unwrap();
        manager.splice(&session, b"Z").await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["report.txt".to_string()]);
    }
}
