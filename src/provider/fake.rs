//! In-memory cloud used by the orchestration tests.
//!
//! Models just enough provider behavior to exercise ordering and resumption:
//! certificates issue only after their validation record is published,
//! distribution changes take a few reads to deploy, and non-empty buckets or
//! enabled distributions refuse deletion.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ProviderError, Result};
use crate::state::ValidationRecord;

use super::traits::{Cdn, CertificateAuthority, Dns, ObjectStorage, Providers};
use super::types::{
    CertificateDetails, CertificateStatus, DISTRIBUTION_DEPLOYED, DistributionInfo,
    DistributionSpec, HostedZone, ObjectUpload, PublicAccess, RecordSet,
};

const IN_PROGRESS: &str = "InProgress";

#[derive(Debug, Clone, Default)]
pub struct FakeBucket {
    pub region: String,
    pub objects: BTreeMap<String, ObjectUpload>,
    pub website: bool,
    pub policy: Option<String>,
    pub public_access: Option<PublicAccess>,
}

#[derive(Debug, Clone)]
pub struct FakeDistribution {
    pub info: DistributionInfo,
    pub origin_domain: String,
    pub oac_id: String,
    pub aliases: Vec<String>,
    pub certificate_arn: Option<String>,
    reads_since_change: usize,
}

#[derive(Debug, Clone)]
pub struct FakeCertificate {
    pub domain: String,
    pub record: ValidationRecord,
    pub describes: usize,
    pub terminal: Option<CertificateStatus>,
}

#[derive(Debug, Default)]
struct CloudState {
    buckets: HashMap<String, FakeBucket>,
    oacs: HashMap<String, String>,
    distributions: HashMap<String, FakeDistribution>,
    certificates: HashMap<String, FakeCertificate>,
    zones: Vec<HostedZone>,
    records: HashMap<(String, String), RecordSet>,
    invalidations: Vec<(String, Vec<String>)>,
    calls: Vec<&'static str>,
    failing: HashSet<&'static str>,
    next_id: usize,
    deploy_after_reads: usize,
    issue_after_describes: usize,
    record_after_describes: usize,
    new_certificate_status: Option<CertificateStatus>,
}

impl CloudState {
    fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn record_published(&self, record: &ValidationRecord) -> bool {
        self.records
            .values()
            .any(|r| matches!(r, RecordSet::Simple(published) if published == record))
    }
}

/// A cloud that lives in memory. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(resource: &str, id: &str) -> crate::error::SpaDeployError {
    ProviderError::NotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
    .into()
}

fn rejected(operation: &'static str, message: &str) -> crate::error::SpaDeployError {
    ProviderError::request("fake", operation, message).into()
}

impl FakeCloud {
    pub fn new() -> Self {
        let state = CloudState {
            deploy_after_reads: 1,
            issue_after_describes: 1,
            ..CloudState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn providers(&self) -> Providers {
        Providers {
            storage: Arc::new(self.clone()),
            cdn: Arc::new(self.clone()),
            certificates: Arc::new(self.clone()),
            dns: Arc::new(self.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().expect("fake cloud lock poisoned")
    }

    /// Logs the call and applies injected failures.
    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, CloudState>> {
        let mut state = self.lock();
        state.calls.push(operation);
        if state.failing.contains(operation) {
            return Err(rejected(operation, "injected failure"));
        }
        Ok(state)
    }

    pub fn fail(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.lock().failing.remove(operation);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Index of the first call to `operation`, for ordering assertions.
    pub fn position(&self, operation: &str) -> Option<usize> {
        self.lock().calls.iter().position(|c| *c == operation)
    }

    pub fn set_deploy_after_reads(&self, reads: usize) {
        self.lock().deploy_after_reads = reads;
    }

    pub fn set_issue_after_describes(&self, describes: usize) {
        self.lock().issue_after_describes = describes;
    }

    pub fn set_record_after_describes(&self, describes: usize) {
        self.lock().record_after_describes = describes;
    }

    /// Newly requested certificates end up in this terminal status.
    pub fn set_new_certificate_status(&self, status: CertificateStatus) {
        self.lock().new_certificate_status = Some(status);
    }

    pub fn add_zone(&self, name: &str) -> String {
        let mut state = self.lock();
        let id = format!("Z{}", state.next_id());
        state.zones.push(HostedZone {
            id: id.clone(),
            name: name.to_string(),
        });
        id
    }

    /// Creates a bucket the tool did not create.
    pub fn seed_bucket(&self, name: &str, region: &str) {
        self.lock().buckets.insert(
            name.to_string(),
            FakeBucket {
                region: region.to_string(),
                ..FakeBucket::default()
            },
        );
    }

    pub fn bucket(&self, name: &str) -> Option<FakeBucket> {
        self.lock().buckets.get(name).cloned()
    }

    pub fn distribution(&self, id: &str) -> Option<FakeDistribution> {
        self.lock().distributions.get(id).cloned()
    }

    pub fn distribution_count(&self) -> usize {
        self.lock().distributions.len()
    }

    pub fn certificate(&self, arn: &str) -> Option<FakeCertificate> {
        self.lock().certificates.get(arn).cloned()
    }

    pub fn certificate_count(&self) -> usize {
        self.lock().certificates.len()
    }

    pub fn oac_count(&self) -> usize {
        self.lock().oacs.len()
    }

    pub fn record(&self, zone_id: &str, name: &str) -> Option<RecordSet> {
        self.lock()
            .records
            .get(&(zone_id.to_string(), name.to_lowercase()))
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    pub fn invalidations(&self) -> Vec<(String, Vec<String>)> {
        self.lock().invalidations.clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeCloud {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.enter("bucket_exists")?.buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut state = self.enter("create_bucket")?;
        if state.buckets.contains_key(bucket) {
            return Err(rejected("create_bucket", "BucketAlreadyOwnedByYou"));
        }
        state.buckets.insert(
            bucket.to_string(),
            FakeBucket {
                region: region.to_string(),
                ..FakeBucket::default()
            },
        );
        Ok(())
    }

    async fn set_public_access(&self, bucket: &str, access: PublicAccess) -> Result<()> {
        let mut state = self.enter("set_public_access")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        entry.public_access = Some(access);
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        let mut state = self.enter("put_bucket_policy")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        entry.policy = Some(policy.to_string());
        Ok(())
    }

    async fn enable_website(&self, bucket: &str, _index: &str, _error: &str) -> Result<()> {
        let mut state = self.enter("enable_website")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        entry.website = true;
        Ok(())
    }

    async fn disable_website(&self, bucket: &str) -> Result<()> {
        let mut state = self.enter("disable_website")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        entry.website = false;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: &ObjectUpload) -> Result<()> {
        let mut state = self.enter("put_object")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        entry.objects.insert(object.key.clone(), object.clone());
        Ok(())
    }

    async fn delete_all_versions(&self, bucket: &str) -> Result<usize> {
        let mut state = self.enter("delete_all_versions")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        let count = entry.objects.len();
        entry.objects.clear();
        Ok(count)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.enter("delete_bucket")?;
        let entry = state
            .buckets
            .get(bucket)
            .ok_or_else(|| not_found("S3 bucket", bucket))?;
        if !entry.objects.is_empty() {
            return Err(rejected("delete_bucket", "BucketNotEmpty"));
        }
        state.buckets.remove(bucket);
        Ok(())
    }
}

#[async_trait]
impl Cdn for FakeCloud {
    async fn find_origin_access_control(&self, name: &str) -> Result<Option<String>> {
        let state = self.enter("find_origin_access_control")?;
        Ok(state
            .oacs
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| id.clone()))
    }

    async fn create_origin_access_control(&self, name: &str) -> Result<String> {
        let mut state = self.enter("create_origin_access_control")?;
        let id = format!("OAC{}", state.next_id());
        state.oacs.insert(id.clone(), name.to_string());
        Ok(id)
    }

    async fn delete_origin_access_control(&self, id: &str) -> Result<()> {
        let mut state = self.enter("delete_origin_access_control")?;
        if state.distributions.values().any(|d| d.oac_id == id) {
            return Err(rejected(
                "delete_origin_access_control",
                "OriginAccessControlInUse",
            ));
        }
        state
            .oacs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("CloudFront origin access control", id))
    }

    async fn find_distribution(&self, origin_domain: &str) -> Result<Option<DistributionInfo>> {
        let state = self.enter("find_distribution")?;
        Ok(state
            .distributions
            .values()
            .find(|d| d.origin_domain == origin_domain)
            .map(|d| d.info.clone()))
    }

    async fn create_distribution(&self, spec: &DistributionSpec) -> Result<DistributionInfo> {
        let mut state = self.enter("create_distribution")?;
        if let Some(arn) = &spec.certificate_arn {
            let issued = state.certificates.get(arn).is_some_and(|c| {
                c.terminal.is_none() && state.record_published(&c.record)
            });
            if !issued {
                return Err(rejected("create_distribution", "InvalidViewerCertificate"));
            }
        }

        let n = state.next_id();
        let info = DistributionInfo {
            id: format!("E{n}"),
            arn: format!("arn:aws:cloudfront::123456789012:distribution/E{n}"),
            domain_name: format!("d{n}.cloudfront.net"),
            status: String::from(IN_PROGRESS),
            enabled: true,
        };
        state.distributions.insert(
            info.id.clone(),
            FakeDistribution {
                info: info.clone(),
                origin_domain: spec.origin_domain.clone(),
                oac_id: spec.oac_id.clone(),
                aliases: spec.aliases.clone(),
                certificate_arn: spec.certificate_arn.clone(),
                reads_since_change: 0,
            },
        );
        Ok(info)
    }

    async fn get_distribution(&self, id: &str) -> Result<DistributionInfo> {
        let mut state = self.enter("get_distribution")?;
        let deploy_after = state.deploy_after_reads;
        let distribution = state
            .distributions
            .get_mut(id)
            .ok_or_else(|| not_found("CloudFront distribution", id))?;
        distribution.reads_since_change += 1;
        if distribution.reads_since_change >= deploy_after {
            distribution.info.status = String::from(DISTRIBUTION_DEPLOYED);
        }
        Ok(distribution.info.clone())
    }

    async fn attach_certificate(
        &self,
        id: &str,
        domain: &str,
        certificate_arn: &str,
    ) -> Result<()> {
        let mut state = self.enter("attach_certificate")?;
        let distribution = state
            .distributions
            .get_mut(id)
            .ok_or_else(|| not_found("CloudFront distribution", id))?;
        distribution.aliases = vec![domain.to_string()];
        distribution.certificate_arn = Some(certificate_arn.to_string());
        distribution.info.status = String::from(IN_PROGRESS);
        distribution.reads_since_change = 0;
        Ok(())
    }

    async fn disable_distribution(&self, id: &str) -> Result<()> {
        let mut state = self.enter("disable_distribution")?;
        let distribution = state
            .distributions
            .get_mut(id)
            .ok_or_else(|| not_found("CloudFront distribution", id))?;
        if distribution.info.enabled {
            distribution.info.enabled = false;
            distribution.info.status = String::from(IN_PROGRESS);
            distribution.reads_since_change = 0;
        }
        Ok(())
    }

    async fn delete_distribution(&self, id: &str) -> Result<()> {
        let mut state = self.enter("delete_distribution")?;
        let distribution = state
            .distributions
            .get(id)
            .ok_or_else(|| not_found("CloudFront distribution", id))?;
        if distribution.info.enabled || !distribution.info.is_deployed() {
            return Err(rejected("delete_distribution", "DistributionNotDisabled"));
        }
        state.distributions.remove(id);
        Ok(())
    }

    async fn create_invalidation(&self, id: &str, paths: &[String]) -> Result<String> {
        let mut state = self.enter("create_invalidation")?;
        if !state.distributions.contains_key(id) {
            return Err(not_found("CloudFront distribution", id));
        }
        let n = state.next_id();
        state.invalidations.push((id.to_string(), paths.to_vec()));
        Ok(format!("I{n}"))
    }
}

#[async_trait]
impl CertificateAuthority for FakeCloud {
    async fn find_certificate(&self, domain: &str) -> Result<Option<String>> {
        let state = self.enter("find_certificate")?;
        Ok(state
            .certificates
            .iter()
            .find(|(_, c)| c.domain == domain && c.terminal.is_none())
            .map(|(arn, _)| arn.clone()))
    }

    async fn request_certificate(&self, domain: &str) -> Result<String> {
        let mut state = self.enter("request_certificate")?;
        let n = state.next_id();
        let arn = format!("arn:aws:acm:us-east-1:123456789012:certificate/c{n}");
        let terminal = state.new_certificate_status.clone();
        state.certificates.insert(
            arn.clone(),
            FakeCertificate {
                domain: domain.to_string(),
                record: ValidationRecord {
                    name: format!("_v{n}.{domain}."),
                    record_type: String::from("CNAME"),
                    value: format!("_v{n}.acm-validations.aws."),
                },
                describes: 0,
                terminal,
            },
        );
        Ok(arn)
    }

    async fn describe_certificate(&self, arn: &str) -> Result<CertificateDetails> {
        let mut state = self.enter("describe_certificate")?;
        let record_after = state.record_after_describes;
        let issue_after = state.issue_after_describes;

        let cert = state
            .certificates
            .get_mut(arn)
            .ok_or_else(|| not_found("ACM certificate", arn))?;
        cert.describes += 1;
        let cert = cert.clone();

        let status = match &cert.terminal {
            Some(terminal) => terminal.clone(),
            None if cert.describes >= issue_after && state.record_published(&cert.record) => {
                CertificateStatus::Issued
            }
            None => CertificateStatus::PendingValidation,
        };
        let failure_reason = status
            .is_terminal_failure()
            .then(|| String::from("CAA_ERROR"));

        Ok(CertificateDetails {
            arn: arn.to_string(),
            status,
            validation_record: (cert.describes > record_after).then(|| cert.record.clone()),
            failure_reason,
        })
    }

    async fn delete_certificate(&self, arn: &str) -> Result<()> {
        let mut state = self.enter("delete_certificate")?;
        let in_use = state
            .distributions
            .values()
            .any(|d| d.certificate_arn.as_deref() == Some(arn));
        if in_use {
            return Err(rejected("delete_certificate", "ResourceInUseException"));
        }
        state
            .certificates
            .remove(arn)
            .map(|_| ())
            .ok_or_else(|| not_found("ACM certificate", arn))
    }
}

#[async_trait]
impl Dns for FakeCloud {
    async fn find_zone(&self, name: &str) -> Result<Option<HostedZone>> {
        let state = self.enter("find_zone")?;
        Ok(state
            .zones
            .iter()
            .find(|z| z.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn upsert_record_set(&self, zone_id: &str, record: &RecordSet) -> Result<()> {
        let mut state = self.enter("upsert_record_set")?;
        if !state.zones.iter().any(|z| z.id == zone_id) {
            return Err(not_found("Route53 hosted zone", zone_id));
        }
        state.records.insert(
            (zone_id.to_string(), record.name().to_lowercase()),
            record.clone(),
        );
        Ok(())
    }

    async fn delete_record_set(&self, zone_id: &str, record: &RecordSet) -> Result<()> {
        let mut state = self.enter("delete_record_set")?;
        let key = (zone_id.to_string(), record.name().to_lowercase());
        match state.records.get(&key) {
            None => Err(not_found("Route53 record", record.name())),
            // Route53 only deletes a record whose values match exactly.
            Some(existing) if existing != record => {
                Err(rejected("delete_record_set", "InvalidChangeBatch"))
            }
            Some(_) => {
                state.records.remove(&key);
                Ok(())
            }
        }
    }
}
