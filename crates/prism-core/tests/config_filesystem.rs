//! Config-driven pipeline over the filesystem store.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use prism_core::{Config, DerivativeOutcome, Prism, ProcessOptions, ProcessOutcome, ProcessingStats};

fn config_for(root: &std::path::Path) -> Config {
    let toml = format!(
        r#"
        [store]
        backend = "filesystem"
        bucket_url = "https://cdn.example.com/"
        root = "{}"

        [[collections]]
        name = "avatars"
        key_prefix = "users/"
        format = "png"
        default_image = "anonymous"

        [[collections.derivatives]]
        key_suffix = "(120x80)"
        transforms = [{{ type = "thumbnail", width = 120, height = 80 }}]

        [[collections.derivatives]]
        key_suffix = "(bw)"
        transforms = [
            {{ type = "thumbnail", height = 50 }},
            {{ type = "grayscale" }},
        ]
        "#,
        root.display()
    );
    Config::from_toml_str(&toml).unwrap()
}

/// Stored keys carry no extension, so the format is sniffed from content.
fn open_stored(path: &std::path::Path) -> DynamicImage {
    image::load_from_memory(&std::fs::read(path).unwrap()).unwrap()
}

fn sample() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(333, 100, |x, y| {
        Rgb([(x % 256) as u8, (y * 2) as u8, 40])
    }))
}

#[tokio::test]
async fn config_to_stored_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let prism = Prism::from_config(&config).unwrap();
    let avatars = prism.collection_named(&config, "avatars").unwrap();

    let source = dir.path().join("upload.png");
    sample().save(&source).unwrap();

    let outcome = avatars
        .process_path(&source, &ProcessOptions::default())
        .await
        .unwrap();
    let hash = outcome.hash().unwrap().to_string();

    let users = dir.path().join("users");
    assert!(users.join(&hash).is_file());
    assert!(users.join(format!("{hash}.meta.json")).is_file());

    let thumb = open_stored(&users.join(format!("{hash}(120x80)")));
    assert_eq!(thumb.dimensions(), (120, 80));

    // Height-only spec keeps the source ratio: floor(50 * 3.33) = 166
    let bw = open_stored(&users.join(format!("{hash}(bw)")));
    assert_eq!(bw.dimensions(), (166, 50));
    assert_eq!(bw.color(), image::ColorType::L8);

    assert_eq!(
        avatars.get_url(Some(hash.as_str())),
        Some(format!("https://cdn.example.com/users/{hash}"))
    );
    assert_eq!(
        avatars.get_url(None).as_deref(),
        Some("https://cdn.example.com/users/anonymous")
    );
}

#[tokio::test]
async fn stats_across_runs_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let prism = Prism::from_config(&config).unwrap();
    let avatars = prism.collection_named(&config, "avatars").unwrap();

    let mut encoded = Vec::new();
    sample()
        .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
        .unwrap();

    let mut stats = ProcessingStats::default();
    for _ in 0..2 {
        let outcome = avatars
            .process_bytes(encoded.clone(), &ProcessOptions::default())
            .await
            .unwrap();
        stats.record(&outcome);
    }
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.generated, 2);
    assert_eq!(stats.skipped, 2);

    let outcome = avatars
        .process_bytes(encoded, &ProcessOptions::default())
        .await
        .unwrap();
    let ProcessOutcome::Stored { derivatives, .. } = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert!(derivatives
        .iter()
        .all(|d| d.outcome == DerivativeOutcome::Skipped));

    let hash = outcome.hash().unwrap().to_string();
    assert_eq!(avatars.delete(&hash).await.unwrap(), 3);
    let remaining: Vec<_> = std::fs::read_dir(dir.path().join("users"))
        .unwrap()
        .collect();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn unsupported_input_is_rejected_before_storing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let prism = Prism::from_config(&config).unwrap();
    let avatars = prism.collection_named(&config, "avatars").unwrap();

    let err = avatars
        .process_bytes(b"GIF89a\x01\x00\x01\x00\x00\x00\x00".to_vec(), &ProcessOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("gif"));
    assert!(!dir.path().join("users").exists());
}
