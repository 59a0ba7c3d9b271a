//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 document for the Proof-of-Art API.

use utoipa::OpenApi;

use crate::handlers::{
    GenerateRequest, GenerateResponse, HealthResponse, ProofView, ReadyResponse, VerifyRequest,
    VerifyResponse,
};

/// Proof-of-Art API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Proof-of-Art API",
        version = "0.1.0",
        description = r#"
## Verifiable Authorship for Generated Artifacts

Every artifact produced through `POST /generate` is bound to its prompt, its
creator and the moment of creation:

```
combinedHash = SHA-256(promptHash || outputHash || creator || timestampMs)
```

The artifact and a metadata document are pinned to IPFS and the combined hash
is registered on an EVM ledger. Anyone holding the file and its certificate can
re-derive the hash and check it with `POST /verify`.

Storage and ledger failures never discard a generated artifact: the response
carries sentinel values (`not-available`, `upload-failed`) or an unregistered
status, plus a `warnings` list.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Creation", description = "Generate an artifact and attest to it"),
        (name = "Verification", description = "Check a proof against the ledger"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::generate::generate_handler,
        crate::handlers::verify::verify_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            GenerateRequest,
            GenerateResponse,
            ProofView,
            VerifyRequest,
            VerifyResponse,
        )
    )
)]
pub struct ApiDoc;
