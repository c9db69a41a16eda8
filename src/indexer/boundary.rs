//! Boundary classification for external imports.
//!
//! A third-party import is tagged with a coarse functional category
//! (payment, database, cache, ...) resolved by longest-prefix match against
//! curated per-ecosystem tables, keyed by the importing file's language.

pub const CATEGORY_DEFAULT: &str = "library";

struct BoundaryRule {
    prefix: &'static str,
    category: &'static str,
}

static NPM_RULES: &[BoundaryRule] = &[
    BoundaryRule { prefix: "stripe", category: "payment" },
    BoundaryRule { prefix: "braintree", category: "payment" },
    BoundaryRule { prefix: "@paypal", category: "payment" },
    BoundaryRule { prefix: "square", category: "payment" },
    BoundaryRule { prefix: "pg", category: "database" },
    BoundaryRule { prefix: "mysql", category: "database" },
    BoundaryRule { prefix: "mongoose", category: "database" },
    BoundaryRule { prefix: "mongodb", category: "database" },
    BoundaryRule { prefix: "typeorm", category: "database" },
    BoundaryRule { prefix: "sequelize", category: "database" },
    BoundaryRule { prefix: "knex", category: "database" },
    BoundaryRule { prefix: "@prisma", category: "database" },
    BoundaryRule { prefix: "prisma", category: "database" },
    BoundaryRule { prefix: "drizzle-orm", category: "database" },
    BoundaryRule { prefix: "sqlite3", category: "database" },
    BoundaryRule { prefix: "redis", category: "cache" },
    BoundaryRule { prefix: "ioredis", category: "cache" },
    BoundaryRule { prefix: "memcached", category: "cache" },
    BoundaryRule { prefix: "node-cache", category: "cache" },
    BoundaryRule { prefix: "kafkajs", category: "messaging" },
    BoundaryRule { prefix: "amqplib", category: "messaging" },
    BoundaryRule { prefix: "bullmq", category: "messaging" },
    BoundaryRule { prefix: "bull", category: "messaging" },
    BoundaryRule { prefix: "nats", category: "messaging" },
    BoundaryRule { prefix: "passport", category: "auth" },
    BoundaryRule { prefix: "jsonwebtoken", category: "auth" },
    BoundaryRule { prefix: "bcrypt", category: "auth" },
    BoundaryRule { prefix: "@auth0", category: "auth" },
    BoundaryRule { prefix: "next-auth", category: "auth" },
    BoundaryRule { prefix: "aws-sdk", category: "cloud" },
    BoundaryRule { prefix: "@aws-sdk", category: "cloud" },
    BoundaryRule { prefix: "@google-cloud", category: "cloud" },
    BoundaryRule { prefix: "@azure", category: "cloud" },
    BoundaryRule { prefix: "firebase", category: "cloud" },
    BoundaryRule { prefix: "@sentry", category: "monitoring" },
    BoundaryRule { prefix: "dd-trace", category: "monitoring" },
    BoundaryRule { prefix: "prom-client", category: "monitoring" },
    BoundaryRule { prefix: "winston", category: "monitoring" },
    BoundaryRule { prefix: "pino", category: "monitoring" },
    BoundaryRule { prefix: "axios", category: "http-client" },
    BoundaryRule { prefix: "node-fetch", category: "http-client" },
    BoundaryRule { prefix: "got", category: "http-client" },
    BoundaryRule { prefix: "superagent", category: "http-client" },
    BoundaryRule { prefix: "jest", category: "testing" },
    BoundaryRule { prefix: "mocha", category: "testing" },
    BoundaryRule { prefix: "chai", category: "testing" },
    BoundaryRule { prefix: "vitest", category: "testing" },
    BoundaryRule { prefix: "@testing-library", category: "testing" },
    BoundaryRule { prefix: "cypress", category: "testing" },
    BoundaryRule { prefix: "react", category: "ui-framework" },
    BoundaryRule { prefix: "vue", category: "ui-framework" },
    BoundaryRule { prefix: "@angular", category: "ui-framework" },
    BoundaryRule { prefix: "svelte", category: "ui-framework" },
    BoundaryRule { prefix: "next", category: "ui-framework" },
    BoundaryRule { prefix: "openai", category: "ai-ml" },
    BoundaryRule { prefix: "@anthropic-ai", category: "ai-ml" },
    BoundaryRule { prefix: "langchain", category: "ai-ml" },
    BoundaryRule { prefix: "@langchain", category: "ai-ml" },
    BoundaryRule { prefix: "@tensorflow", category: "ai-ml" },
];

static PYPI_RULES: &[BoundaryRule] = &[
    BoundaryRule { prefix: "stripe", category: "payment" },
    BoundaryRule { prefix: "braintree", category: "payment" },
    BoundaryRule { prefix: "paypal", category: "payment" },
    BoundaryRule { prefix: "sqlalchemy", category: "database" },
    BoundaryRule { prefix: "psycopg", category: "database" },
    BoundaryRule { prefix: "pymongo", category: "database" },
    BoundaryRule { prefix: "django.db", category: "database" },
    BoundaryRule { prefix: "peewee", category: "database" },
    BoundaryRule { prefix: "asyncpg", category: "database" },
    BoundaryRule { prefix: "redis", category: "cache" },
    BoundaryRule { prefix: "memcache", category: "cache" },
    BoundaryRule { prefix: "kafka", category: "messaging" },
    BoundaryRule { prefix: "pika", category: "messaging" },
    BoundaryRule { prefix: "celery", category: "messaging" },
    BoundaryRule { prefix: "jwt", category: "auth" },
    BoundaryRule { prefix: "authlib", category: "auth" },
    BoundaryRule { prefix: "passlib", category: "auth" },
    BoundaryRule { prefix: "boto3", category: "cloud" },
    BoundaryRule { prefix: "botocore", category: "cloud" },
    BoundaryRule { prefix: "google.cloud", category: "cloud" },
    BoundaryRule { prefix: "azure", category: "cloud" },
    BoundaryRule { prefix: "sentry_sdk", category: "monitoring" },
    BoundaryRule { prefix: "datadog", category: "monitoring" },
    BoundaryRule { prefix: "prometheus_client", category: "monitoring" },
    BoundaryRule { prefix: "structlog", category: "monitoring" },
    BoundaryRule { prefix: "requests", category: "http-client" },
    BoundaryRule { prefix: "httpx", category: "http-client" },
    BoundaryRule { prefix: "aiohttp", category: "http-client" },
    BoundaryRule { prefix: "urllib3", category: "http-client" },
    BoundaryRule { prefix: "pytest", category: "testing" },
    BoundaryRule { prefix: "unittest", category: "testing" },
    BoundaryRule { prefix: "hypothesis", category: "testing" },
    BoundaryRule { prefix: "flask", category: "ui-framework" },
    BoundaryRule { prefix: "django", category: "ui-framework" },
    BoundaryRule { prefix: "fastapi", category: "ui-framework" },
    BoundaryRule { prefix: "openai", category: "ai-ml" },
    BoundaryRule { prefix: "anthropic", category: "ai-ml" },
    BoundaryRule { prefix: "langchain", category: "ai-ml" },
    BoundaryRule { prefix: "torch", category: "ai-ml" },
    BoundaryRule { prefix: "tensorflow", category: "ai-ml" },
    BoundaryRule { prefix: "sklearn", category: "ai-ml" },
    BoundaryRule { prefix: "transformers", category: "ai-ml" },
];

static GO_RULES: &[BoundaryRule] = &[
    BoundaryRule { prefix: "github.com/stripe", category: "payment" },
    BoundaryRule { prefix: "github.com/lib/pq", category: "database" },
    BoundaryRule { prefix: "github.com/jackc/pgx", category: "database" },
    BoundaryRule { prefix: "gorm.io", category: "database" },
    BoundaryRule { prefix: "go.mongodb.org", category: "database" },
    BoundaryRule { prefix: "database/sql", category: "database" },
    BoundaryRule { prefix: "github.com/redis", category: "cache" },
    BoundaryRule { prefix: "github.com/go-redis", category: "cache" },
    BoundaryRule { prefix: "github.com/segmentio/kafka-go", category: "messaging" },
    BoundaryRule { prefix: "github.com/nats-io", category: "messaging" },
    BoundaryRule { prefix: "github.com/rabbitmq", category: "messaging" },
    BoundaryRule { prefix: "github.com/golang-jwt", category: "auth" },
    BoundaryRule { prefix: "golang.org/x/oauth2", category: "auth" },
    BoundaryRule { prefix: "github.com/aws/aws-sdk-go", category: "cloud" },
    BoundaryRule { prefix: "cloud.google.com", category: "cloud" },
    BoundaryRule { prefix: "github.com/Azure", category: "cloud" },
    BoundaryRule { prefix: "github.com/getsentry", category: "monitoring" },
    BoundaryRule { prefix: "github.com/prometheus", category: "monitoring" },
    BoundaryRule { prefix: "go.uber.org/zap", category: "monitoring" },
    BoundaryRule { prefix: "github.com/sirupsen/logrus", category: "monitoring" },
    BoundaryRule { prefix: "net/http", category: "http-client" },
    BoundaryRule { prefix: "github.com/go-resty", category: "http-client" },
    BoundaryRule { prefix: "github.com/stretchr/testify", category: "testing" },
    BoundaryRule { prefix: "github.com/onsi/ginkgo", category: "testing" },
    BoundaryRule { prefix: "github.com/gin-gonic", category: "ui-framework" },
    BoundaryRule { prefix: "github.com/labstack/echo", category: "ui-framework" },
    BoundaryRule { prefix: "github.com/gofiber", category: "ui-framework" },
];

static CARGO_RULES: &[BoundaryRule] = &[
    BoundaryRule { prefix: "stripe", category: "payment" },
    BoundaryRule { prefix: "sqlx", category: "database" },
    BoundaryRule { prefix: "diesel", category: "database" },
    BoundaryRule { prefix: "rusqlite", category: "database" },
    BoundaryRule { prefix: "sea_orm", category: "database" },
    BoundaryRule { prefix: "mongodb", category: "database" },
    BoundaryRule { prefix: "redis", category: "cache" },
    BoundaryRule { prefix: "moka", category: "cache" },
    BoundaryRule { prefix: "rdkafka", category: "messaging" },
    BoundaryRule { prefix: "lapin", category: "messaging" },
    BoundaryRule { prefix: "jsonwebtoken", category: "auth" },
    BoundaryRule { prefix: "oauth2", category: "auth" },
    BoundaryRule { prefix: "argon2", category: "auth" },
    BoundaryRule { prefix: "aws_sdk", category: "cloud" },
    BoundaryRule { prefix: "aws_config", category: "cloud" },
    BoundaryRule { prefix: "sentry", category: "monitoring" },
    BoundaryRule { prefix: "tracing", category: "monitoring" },
    BoundaryRule { prefix: "prometheus", category: "monitoring" },
    BoundaryRule { prefix: "metrics", category: "monitoring" },
    BoundaryRule { prefix: "reqwest", category: "http-client" },
    BoundaryRule { prefix: "hyper", category: "http-client" },
    BoundaryRule { prefix: "ureq", category: "http-client" },
    BoundaryRule { prefix: "proptest", category: "testing" },
    BoundaryRule { prefix: "quickcheck", category: "testing" },
    BoundaryRule { prefix: "axum", category: "ui-framework" },
    BoundaryRule { prefix: "actix_web", category: "ui-framework" },
    BoundaryRule { prefix: "rocket", category: "ui-framework" },
    BoundaryRule { prefix: "candle", category: "ai-ml" },
    BoundaryRule { prefix: "tch", category: "ai-ml" },
];

static MAVEN_RULES: &[BoundaryRule] = &[
    BoundaryRule { prefix: "com.stripe", category: "payment" },
    BoundaryRule { prefix: "com.braintreegateway", category: "payment" },
    BoundaryRule { prefix: "java.sql", category: "database" },
    BoundaryRule { prefix: "javax.persistence", category: "database" },
    BoundaryRule { prefix: "jakarta.persistence", category: "database" },
    BoundaryRule { prefix: "org.hibernate", category: "database" },
    BoundaryRule { prefix: "org.springframework.data", category: "database" },
    BoundaryRule { prefix: "com.mongodb", category: "database" },
    BoundaryRule { prefix: "redis.clients", category: "cache" },
    BoundaryRule { prefix: "io.lettuce", category: "cache" },
    BoundaryRule { prefix: "com.github.benmanes.caffeine", category: "cache" },
    BoundaryRule { prefix: "org.apache.kafka", category: "messaging" },
    BoundaryRule { prefix: "com.rabbitmq", category: "messaging" },
    BoundaryRule { prefix: "javax.jms", category: "messaging" },
    BoundaryRule { prefix: "io.jsonwebtoken", category: "auth" },
    BoundaryRule { prefix: "org.springframework.security", category: "auth" },
    BoundaryRule { prefix: "com.amazonaws", category: "cloud" },
    BoundaryRule { prefix: "software.amazon.awssdk", category: "cloud" },
    BoundaryRule { prefix: "com.google.cloud", category: "cloud" },
    BoundaryRule { prefix: "com.azure", category: "cloud" },
    BoundaryRule { prefix: "io.sentry", category: "monitoring" },
    BoundaryRule { prefix: "io.micrometer", category: "monitoring" },
    BoundaryRule { prefix: "org.slf4j", category: "monitoring" },
    BoundaryRule { prefix: "ch.qos.logback", category: "monitoring" },
    BoundaryRule { prefix: "java.net.http", category: "http-client" },
    BoundaryRule { prefix: "okhttp3", category: "http-client" },
    BoundaryRule { prefix: "org.apache.http", category: "http-client" },
    BoundaryRule { prefix: "org.junit", category: "testing" },
    BoundaryRule { prefix: "org.mockito", category: "testing" },
    BoundaryRule { prefix: "org.assertj", category: "testing" },
    BoundaryRule { prefix: "org.springframework.web", category: "ui-framework" },
    BoundaryRule { prefix: "javax.servlet", category: "ui-framework" },
];

fn rules_for_language(language: &str) -> &'static [BoundaryRule] {
    match language {
        "typescript" | "tsx" | "javascript" => NPM_RULES,
        "python" => PYPI_RULES,
        "go" => GO_RULES,
        "rust" => CARGO_RULES,
        "java" => MAVEN_RULES,
        _ => &[],
    }
}

/// Classify an external package by longest-prefix match against the
/// language's curated table. Falls back to an unclassified default.
pub fn classify(package: &str, language: &str) -> &'static str {
    let mut best: Option<(&'static str, usize)> = None;
    for rule in rules_for_language(language) {
        if !matches_prefix(package, rule.prefix) {
            continue;
        }
        let len = rule.prefix.len();
        if best.map(|(_, best_len)| len > best_len).unwrap_or(true) {
            best = Some((rule.category, len));
        }
    }
    best.map(|(category, _)| category).unwrap_or(CATEGORY_DEFAULT)
}

/// Prefix match at a package-segment boundary: "redis" matches "redis" and
/// "redis/cluster" but not "redisson".
fn matches_prefix(package: &str, prefix: &str) -> bool {
    let Some(rest) = package.strip_prefix(prefix) else {
        return false;
    };
    rest.is_empty() || rest.starts_with('/') || rest.starts_with('.') || rest.starts_with('-')
}

/// Extract the package name from a module specifier: for npm the scope plus
/// first segment (`@aws-sdk/client-s3`), otherwise the first path segment
/// for path-shaped specifiers and the dotted root for Python/Java.
pub fn package_name(specifier: &str, language: &str) -> String {
    match language {
        "typescript" | "tsx" | "javascript" => {
            let mut parts = specifier.split('/');
            match (parts.next(), parts.next()) {
                (Some(scope), Some(name)) if scope.starts_with('@') => format!("{scope}/{name}"),
                (Some(first), _) => first.to_string(),
                _ => specifier.to_string(),
            }
        }
        "python" | "java" => specifier
            .split('.')
            .next()
            .unwrap_or(specifier)
            .to_string(),
        "go" => specifier.to_string(),
        "rust" => specifier
            .split("::")
            .next()
            .unwrap_or(specifier)
            .to_string(),
        _ => specifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        // "next" (ui-framework) vs "next-auth" (auth)
        assert_eq!(classify("next-auth", "typescript"), "auth");
        assert_eq!(classify("next", "typescript"), "ui-framework");
        assert_eq!(classify("@aws-sdk/client-s3", "typescript"), "cloud");
    }

    #[test]
    fn prefix_requires_segment_boundary() {
        assert_eq!(classify("redis", "python"), "cache");
        assert_eq!(classify("redisson", "python"), CATEGORY_DEFAULT);
        assert_eq!(classify("django.db.models", "python"), "database");
        assert_eq!(classify("django.urls", "python"), "ui-framework");
    }

    #[test]
    fn unknown_packages_get_default() {
        assert_eq!(classify("leftpad", "typescript"), CATEGORY_DEFAULT);
        assert_eq!(classify("anything", "cobol"), CATEGORY_DEFAULT);
    }

    #[test]
    fn package_names_per_ecosystem() {
        assert_eq!(package_name("@aws-sdk/client-s3", "typescript"), "@aws-sdk/client-s3");
        assert_eq!(package_name("lodash/fp", "typescript"), "lodash");
        assert_eq!(package_name("google.cloud.storage", "python"), "google");
        assert_eq!(package_name("serde::de", "rust"), "serde");
    }
}
