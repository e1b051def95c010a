//! Archive fixtures and a mock origin server

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Content of the sample entry
pub const SAMPLE_CONTENT: &[u8] = b"This is a test file.";

/// Name of the sample entry
pub const SAMPLE_ENTRY: &str = "file1.tar.zst";

/// Modification time stamped on every fixture entry
pub const FIXTURE_MTIME: u64 = 1_700_000_000;

/// One record in a fixture tar archive
pub enum TarItem<'a> {
    /// Regular file with mode 0644
    File(&'a str, &'a [u8]),
    /// Directory
    Dir(&'a str),
    /// Symbolic link pointing at the second field
    Symlink(&'a str, &'a str),
}

/// Build an uncompressed tar archive
pub fn tar_archive(items: &[TarItem<'_>]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for item in items {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(FIXTURE_MTIME);
        match item {
            TarItem::File(name, content) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                builder
                    .append_data(&mut header, name, *content)
                    .expect("append file");
            }
            TarItem::Dir(name) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_mode(0o755);
                builder
                    .append_data(&mut header, name, std::io::empty())
                    .expect("append directory");
            }
            TarItem::Symlink(name, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder
                    .append_link(&mut header, name, target)
                    .expect("append symlink");
            }
        }
    }
    builder.into_inner().expect("finish tar")
}

/// Build a zstd-compressed tar archive
pub fn tar_zst(items: &[TarItem<'_>]) -> Vec<u8> {
    zstd::encode_all(tar_archive(items).as_slice(), 3).expect("zstd encode")
}

/// The single-entry sample archive
pub fn sample_archive() -> Vec<u8> {
    tar_zst(&[TarItem::File(SAMPLE_ENTRY, SAMPLE_CONTENT)])
}

/// Deterministic, poorly compressible bytes
pub fn pseudo_random(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Start a mock origin that serves `body` at `route`
pub async fn serve_archive(route: &str, body: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}
