//! Wire vocabulary shared with the rest of the harvesting platform.
//!
//! These URIs are a contract with the job controller and the downstream
//! pipeline stages; none of them are free to change here.

// Task statuses. SCHEDULED is written by the job controller when a task
// becomes eligible; this service only ever writes the other three.
pub const STATUS_SCHEDULED: &str = "http://redpencil.data.gift/id/concept/JobStatus/scheduled";
pub const STATUS_BUSY: &str = "http://redpencil.data.gift/id/concept/JobStatus/busy";
pub const STATUS_SUCCESS: &str = "http://redpencil.data.gift/id/concept/JobStatus/success";
pub const STATUS_FAILED: &str = "http://redpencil.data.gift/id/concept/JobStatus/failed";

// Task operations handled by this service. Anything else is ignored.
pub const OP_EXTRACTING: &str =
    "http://lblod.data.gift/id/jobs/concept/TaskOperation/extracting";
/// Deprecated alias for [`OP_EXTRACTING`]; still emitted by old jobs.
pub const OP_IMPORTING_LEGACY: &str =
    "http://lblod.data.gift/id/jobs/concept/TaskOperation/importing";

pub const TASK_TYPE: &str = "http://redpencil.data.gift/vocabularies/tasks/Task";
pub const ERROR_TYPE: &str = "http://open-services.net/ns/core#Error";
pub const ERROR_URI_PREFIX: &str = "http://redpencil.data.gift/id/jobs/error/";
pub const DATA_CONTAINER_URI_PREFIX: &str = "http://redpencil.data.gift/id/dataContainers/";
pub const IMPORT_GRAPH_URI_PREFIX: &str = "http://mu.semte.ch/graphs/harvesting/tasks/import/";

// Unparsed-predicate registry namespace.
pub const UNPARSED_PREDICATE_PREFIX: &str =
    "http://centrale-vindplaats.lblod.info/ns/predicates/";
pub const UNPARSED_FORM_OF: &str =
    "http://centrale-vindplaats.lblod.info/ns/predicates/unparsedFormOf";
// The platform historically labels predicates with rdf#label, not
// rdfs#label. Kept as-is for wire compatibility.
pub const PREDICATE_LABEL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#label";

// Extraction predicates.
pub const PROV_WAS_DERIVED_FROM: &str = "http://www.w3.org/ns/prov#wasDerivedFrom";
pub const CONTENT_VALUE_PREDICATE: &str = "http://www.w3.org/ns/prov#value";
/// Suffix appended to [`CONTENT_VALUE_PREDICATE`] when the HTML literal it
/// carried has been written out as a file and replaced by the file's URI.
pub const EXTERNALIZED_SUFFIX: &str = "-file";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_HTML: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const RDFS_LITERAL: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

/// SPARQL prefix block prepended to the task and container queries.
pub const PREFIXES: &str = r#"PREFIX adms: <http://www.w3.org/ns/adms#>
PREFIX dct: <http://purl.org/dc/terms/>
PREFIX mu: <http://mu.semte.ch/vocabularies/core/>
PREFIX task: <http://redpencil.data.gift/vocabularies/tasks/>
PREFIX cogs: <http://vocab.deri.ie/cogs#>
PREFIX oslc: <http://open-services.net/ns/core#>
PREFIX nie: <http://www.semanticdesktop.org/ontologies/2007/01/19/nie#>
PREFIX nfo: <http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#>
PREFIX prov: <http://www.w3.org/ns/prov#>
"#;

/// True for the operation values this service acts on.
pub fn is_extraction_operation(operation: &str) -> bool {
    operation == OP_EXTRACTING || operation == OP_IMPORTING_LEGACY
}
