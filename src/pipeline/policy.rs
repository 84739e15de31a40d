//! Bucket policies and endpoints derived from the bucket name.

use serde_json::json;

const POLICY_VERSION: &str = "2012-10-17";

fn objects_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}/*")
}

/// Anyone may read any object.
pub(super) fn public_read(bucket: &str) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Sid": "PublicReadGetObject",
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": objects_arn(bucket),
        }]
    })
    .to_string()
}

/// Only the given distribution may read objects.
pub(super) fn distribution_only(bucket: &str, distribution_arn: &str) -> String {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Sid": "AllowCloudFrontServicePrincipal",
            "Effect": "Allow",
            "Principal": { "Service": "cloudfront.amazonaws.com" },
            "Action": "s3:GetObject",
            "Resource": objects_arn(bucket),
            "Condition": {
                "StringEquals": { "AWS:SourceArn": distribution_arn }
            }
        }]
    })
    .to_string()
}

/// Public website endpoint of a bucket.
pub(super) fn website_url(bucket: &str, region: &str) -> String {
    format!("http://{bucket}.s3-website-{region}.amazonaws.com")
}
