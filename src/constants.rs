// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Names of the objects managed around the webhook server
pub mod names {
    /// One-shot job that generates the self-signed CA and server certificate
    pub const TLS_JOB: &str = "devworkspace-tls-job";
    /// Secret holding the self-signed CA, written by the TLS job
    pub const CA_SECRET: &str = "devworkspace-self-signed-certificate";
    /// Default name of the secret holding the server certificate and key
    pub const DEFAULT_SERVER_TLS_SECRET: &str = "devworkspace-operator-webhook-cert";
    /// Service fronting the webhook server
    pub const WEBHOOK_SERVICE: &str = "devworkspace-webhookserver";
    /// ConfigMap that receives the cluster CA bundle
    pub const SECURE_CONFIG_MAP: &str = "devworkspace-webhookserver-secure-service";
    /// Projected volume carrying the CA bundle and serving certificate
    pub const CERT_VOLUME: &str = "webhook-tls-certs";
    /// Named container port the webhook server listens on
    pub const WEBHOOK_PORT_NAME: &str = "webhook-server";
    pub const DEFAULT_SERVICE_ACCOUNT: &str = "devworkspace-webhook-server";
    pub const DEFAULT_CONTROLLER_DEPLOYMENT: &str = "devworkspace-controller-manager";
    /// Value of the `app` label selecting the webhook server pods
    pub const WEBHOOK_APP: &str = "devworkspace-webhook-server";
}

/// Annotation keys consumed by cluster certificate integrations
pub mod annotations {
    /// Prefix shared by every cert-manager annotation
    pub const CERT_MANAGER_PREFIX: &str = "cert-manager.io";
    /// Requests CA injection from a cert-manager Certificate
    pub const CERT_MANAGER_INJECT_CA_FROM: &str = "cert-manager.io/inject-ca-from";
    /// cert-manager Certificate backing the webhook server secret
    pub const CERT_MANAGER_CERTIFICATE: &str = "devworkspace-webhook-certificate";
    /// Asks the service CA operator to materialize a serving cert into the named secret
    pub const SERVING_CERT_SECRET_NAME: &str = "service.beta.openshift.io/serving-cert-secret-name";
    /// Asks the service CA operator to inject its bundle into a ConfigMap
    pub const INJECT_CABUNDLE: &str = "service.beta.openshift.io/inject-cabundle";
}

/// Labels
pub mod labels {
    pub const APP: &str = "app";
    /// Set by the job controller on every pod it spawns
    pub const JOB_NAME: &str = "job-name";
}

/// Environment contract of the TLS job container
pub mod job_env {
    pub const DOMAIN: &str = "DOMAIN";
    pub const NAMESPACE: &str = "NAMESPACE";
    pub const SERVER_TLS_SECRET_NAME: &str = "SERVER_TLS_SECRET_NAME";
    pub const CA_CERTIFICATE_SECRET_NAME: &str = "CA_CERTIFICATE_SECRET_NAME";
}

/// TLS job tuning
pub mod job {
    pub const BACKOFF_LIMIT: i32 = 2;
    pub const TTL_SECONDS_AFTER_FINISHED: i32 = 15;
    pub const TERMINATION_GRACE_PERIOD_SECS: i64 = 30;
    /// Default maximum wait for the job to succeed
    pub const TIMEOUT_SECS: u64 = 60;
    /// Default interval between job status checks
    pub const POLL_INTERVAL_SECS: u64 = 1;
}

/// Key in the injected ConfigMap holding the service CA bundle
pub const SERVICE_CA_KEY: &str = "service-ca.crt";

/// Where controller-runtime style webhook servers read their certificates
pub const WEBHOOK_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";

/// The operator name used for logging and field management
pub const OPERATOR_NAME: &str = "webhook-certs";

/// Default interval between driver resyncs
pub const RESYNC_INTERVAL_SECS: u64 = 300;

/// Mounted into every pod; used when the namespace is not configured explicitly
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
