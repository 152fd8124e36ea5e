use crate::model::fs::FSError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    AWS,
    GCS,
    Memory,
}

/// `gs://bucket/some/prefix` split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketUri {
    pub provider: Provider,
    pub bucket: String,
    pub prefix: Option<String>,
}

pub fn parse_provider_from_uri(bucket_uri: &str) -> Result<Provider, FSError> {
    if bucket_uri.starts_with("s3://") {
        Ok(Provider::AWS)
    } else if bucket_uri.starts_with("gs://") {
        Ok(Provider::GCS)
    } else if bucket_uri.starts_with("mem://") {
        Ok(Provider::Memory)
    } else {
        Err(FSError::InvalidArgument {
            message: format!("failed to parse provider of: {}", bucket_uri),
        })
    }
}

pub fn parse_bucket_uri(bucket_uri: &str) -> Result<BucketUri, FSError> {
    let provider = parse_provider_from_uri(bucket_uri)?;
    let rest = bucket_uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or("");

    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, Some(prefix.trim_matches('/'))),
        None => (rest, None),
    };

    if bucket.is_empty() {
        return Err(FSError::InvalidArgument {
            message: format!("failed to parse bucket of: {}", bucket_uri),
        });
    }

    Ok(BucketUri {
        provider,
        bucket: bucket.to_string(),
        prefix: prefix.filter(|p| !p.is_empty()).map(|p| p.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert!(matches!(parse_provider_from_uri("s3://bucket"), Ok(Provider::AWS)));
        assert!(matches!(parse_provider_from_uri("gs://bucket"), Ok(Provider::GCS)));
        assert!(matches!(parse_provider_from_uri("mem://bucket"), Ok(Provider::Memory)));
        assert!(matches!(parse_provider_from_uri("ftp://bucket"), Err(_)));
    }

    #[test]
    fn test_parse_bucket_uri() {
        let cases = vec![
            ("gs://bucket", Provider::GCS, "bucket", None),
            ("s3://bucket/", Provider::AWS, "bucket", None),
            ("gs://bucket/prefix", Provider::GCS, "bucket", Some("prefix")),
            ("mem://bucket/a/b/", Provider::Memory, "bucket", Some("a/b")),
        ];

        for (input, provider, bucket, prefix) in cases {
            let uri = parse_bucket_uri(input).unwrap();
            assert_eq!(uri.provider, provider, "failed on `provider` for case: {}", input);
            assert_eq!(uri.bucket, bucket, "failed on `bucket` for case: {}", input);
            assert_eq!(
                uri.prefix.as_deref(),
                prefix,
                "failed on `prefix` for case: {}",
                input
            );
        }
    }

    #[test]
    fn test_parse_bucket_uri_without_bucket() {
        assert!(matches!(parse_bucket_uri("gs://"), Err(FSError::InvalidArgument { .. })));
        assert!(matches!(parse_bucket_uri("bucket"), Err(FSError::InvalidArgument { .. })));
    }
}
