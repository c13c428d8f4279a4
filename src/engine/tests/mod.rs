//! Engine integration tests over stubbed fetchers and real ZIP archives.
