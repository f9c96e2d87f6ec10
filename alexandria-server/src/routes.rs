//! Route path constants, kept separate from the `Router` wiring in `main.rs`
//! so handlers and tests can reference the same literal.

pub mod v1 {
    pub const ENRICH_EDITION: &str = "/api/enrich/edition";
    pub const ENRICH_WORK: &str = "/api/enrich/work";
    pub const ENRICH_AUTHOR: &str = "/api/enrich/author";
    pub const ENRICH_QUEUE: &str = "/api/enrich/queue";
    pub const ENRICH_QUEUE_BATCH: &str = "/api/enrich/queue/batch";
    pub const ENRICH_BATCH_DIRECT: &str = "/api/enrich/batch-direct";

    pub const COVERS_QUEUE: &str = "/api/covers/queue";
    pub const COVERS_PROCESS: &str = "/api/covers/process";
    pub const COVERS_STATUS: &str = "/api/covers/status/:isbn";
    pub const COVERS_SERVE: &str = "/covers/:isbn/:size";

    pub const QUOTA_STATUS: &str = "/api/quota/status";

    pub const AUTHORS_ENRICH_BIBLIOGRAPHY: &str = "/api/authors/enrich-bibliography";

    pub const HARVEST_START: &str = "/api/harvest/start";
    pub const HARVEST_BACKFILL: &str = "/api/harvest/backfill";
    pub const HARVEST_BACKFILL_STATUS: &str = "/api/harvest/backfill/:job_id";
}

#[cfg(test)]
mod tests {
    use super::v1;

    fn all_paths() -> Vec<&'static str> {
        vec![
            v1::ENRICH_EDITION,
            v1::ENRICH_WORK,
            v1::ENRICH_AUTHOR,
            v1::ENRICH_QUEUE,
            v1::ENRICH_QUEUE_BATCH,
            v1::ENRICH_BATCH_DIRECT,
            v1::COVERS_QUEUE,
            v1::COVERS_PROCESS,
            v1::COVERS_STATUS,
            v1::COVERS_SERVE,
            v1::QUOTA_STATUS,
            v1::AUTHORS_ENRICH_BIBLIOGRAPHY,
            v1::HARVEST_START,
            v1::HARVEST_BACKFILL,
            v1::HARVEST_BACKFILL_STATUS,
        ]
    }

    #[test]
    fn every_path_is_absolute_and_uses_axum_0_7_param_syntax() {
        for path in all_paths() {
            assert!(path.starts_with('/'), "{path} must be absolute");
            assert!(!path.contains('{'), "{path} uses axum 0.8+ `{{param}}` syntax, not `:param`");
        }
    }

    #[test]
    fn no_two_route_constants_collide() {
        let paths = all_paths();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                assert_ne!(a, b, "duplicate route path {a}");
            }
        }
    }

    #[test]
    fn backfill_status_is_nested_under_the_backfill_start_path() {
        assert!(v1::HARVEST_BACKFILL_STATUS.starts_with(v1::HARVEST_BACKFILL));
        assert!(v1::HARVEST_BACKFILL_STATUS.ends_with(":job_id"));
    }
}
