//! The hop loop: assemble queries, harvest attributes, terminate.

use crate::engine::constants::UNLIMITED_HOPS;
use crate::engine::core::ResolutionJob;
use crate::error::{ResolutionError, Result};
use crate::query::{assemble, QueryAssembly};
use crate::results::{HitsEnvelope, ResolutionResponse};
use crate::types::{Attribute, Value};
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeMap;
use std::time::Instant;

impl ResolutionJob {
    /// Run the resolution job and return the response envelope as JSON text.
    ///
    /// A second call on the same job resets the state accumulated by the
    /// first, so reuse behaves like a fresh job. On error, the partial state
    /// is discarded and no envelope is emitted.
    pub fn run(&mut self) -> Result<String> {
        if self.ran {
            self.reset_state();
        } else {
            self.attributes = self.input.attributes.clone();
        }

        let start = Instant::now();
        let outcome = self.traverse();
        self.ran = true;
        outcome?;
        let took = start.elapsed().as_millis() as u64;

        let response = ResolutionResponse {
            took,
            hits: self.config.include_hits.then(|| HitsEnvelope {
                total: self.hits.len(),
                hits: self.hits.clone(),
            }),
            queries: (self.config.include_queries || self.config.profile)
                .then(|| self.queries.clone()),
        };
        log::info!(
            "resolution finished in {}ms after {} hop(s) with {} hit(s)",
            took,
            self.hop + 1,
            self.hits.len()
        );
        Ok(if self.config.pretty {
            response.to_json_pretty()
        } else {
            response.to_json()
        })
    }

    /// Breadth-first traversal: query every index with the current attribute
    /// state, fold harvested values back in, and stop when a hop discovers
    /// nothing new or the hop limit is reached.
    fn traverse(&mut self) -> Result<()> {
        let index_names: Vec<String> = self.input.model.indices.keys().cloned().collect();
        loop {
            // Attributes collected from this hop's results, the inputs to
            // the next hop's queries.
            let mut next_input: BTreeMap<String, Attribute> = BTreeMap::new();

            for index_name in &index_names {
                self.doc_ids.entry(index_name.clone()).or_default();
                self.check_cancelled()?;

                let seen = &self.doc_ids[index_name];
                let Some(assembly) = assemble(
                    &self.input.model,
                    index_name,
                    &self.attributes,
                    &self.input.scope.include,
                    &self.input.scope.exclude,
                    seen,
                    self.config.max_docs_per_query,
                    self.config.profile,
                )?
                else {
                    continue;
                };

                log::debug!(
                    "hop {} querying index '{}' with {} resolver(s)",
                    self.hop,
                    index_name,
                    assembly.resolvers.len()
                );
                let body = assembly.body.to_string();
                let response = self.backend.search(index_name, &body)?;

                if self.config.include_queries || self.config.profile {
                    let record = self.query_record(index_name, &assembly, &response);
                    self.queries.push(record);
                }

                self.harvest(index_name, &response, &mut next_input);
            }

            let new_values = self.merge(next_input);

            if self.config.max_hops > UNLIMITED_HOPS && self.hop >= self.config.max_hops {
                return Ok(());
            }
            if !new_values {
                return Ok(());
            }
            self.hop += 1;
            self.check_cancelled()?;
        }
    }

    /// Record new documents from one response and collect the attribute
    /// values they carry.
    ///
    /// Harvesting is unconditional so the traversal converges regardless of
    /// the output flags; the flags only shape the hit envelopes.
    fn harvest(
        &mut self,
        index_name: &str,
        response: &Json,
        next_input: &mut BTreeMap<String, Attribute>,
    ) {
        let Some(docs) = response.pointer("/hits/hits").and_then(Json::as_array) else {
            return;
        };
        let Some(index) = self.input.model.indices.get(index_name) else {
            return;
        };
        let seen = self
            .doc_ids
            .get_mut(index_name)
            .expect("doc id set initialized before harvest");

        for doc in docs {
            let Some(id) = doc.get("_id").and_then(Json::as_str) else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }

            let mut doc_attributes: BTreeMap<String, Json> = BTreeMap::new();
            for field in index.fields.values() {
                let Some(spec) = self.input.model.attributes.get(&field.attribute) else {
                    continue;
                };
                let Some(source) = doc.get("_source") else {
                    continue;
                };
                // Multi-fields are absent from _source, so fall back to the
                // parent path when the field path finds nothing.
                let leaf = source.pointer(&field.path).or_else(|| {
                    field
                        .path_parent
                        .as_deref()
                        .and_then(|parent| source.pointer(parent))
                });
                let Some(leaf) = leaf else {
                    continue;
                };

                doc_attributes.insert(field.attribute.clone(), leaf.clone());
                next_input
                    .entry(field.attribute.clone())
                    .or_insert_with(|| Attribute::new(field.attribute.clone(), spec.attr_type))
                    .add_value(Value::create(spec.attr_type, leaf));
            }

            if self.config.include_hits {
                let mut envelope = doc.clone();
                if let Some(obj) = envelope.as_object_mut() {
                    obj.remove("_score");
                    obj.insert("_hop".to_string(), json!(self.hop));
                    if self.config.include_attributes {
                        obj.insert(
                            "_attributes".to_string(),
                            Json::Object(Map::from_iter(doc_attributes)),
                        );
                    }
                    if !self.config.include_source {
                        obj.remove("_source");
                    }
                }
                self.hits.push(envelope);
            }
        }
    }

    /// Fold harvested attributes into the job state.
    /// Returns true if any attribute set grew.
    fn merge(&mut self, next_input: BTreeMap<String, Attribute>) -> bool {
        let mut new_values = false;
        for (name, harvested) in next_input {
            let attribute = self
                .attributes
                .entry(name)
                .or_insert_with(|| Attribute::new(harvested.name.clone(), harvested.attr_type));
            for value in harvested.values {
                if attribute.add_value(value) {
                    new_values = true;
                }
            }
        }
        new_values
    }

    /// A query log record: the hop, the index, the planned resolvers, and
    /// the exchanged request/response with the hit documents stripped
    fn query_record(&self, index_name: &str, assembly: &QueryAssembly, response: &Json) -> Json {
        let mut response_logged = response.clone();
        if let Some(hits) = response_logged.get_mut("hits").and_then(Json::as_object_mut) {
            hits.remove("hits");
        }
        json!({
            "_hop": self.hop,
            "_index": index_name,
            "resolvers": { "list": &assembly.resolvers, "tree": &assembly.filter_tree },
            "search": { "request": &assembly.body, "response": response_logged }
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ResolutionError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::engine::{CancelToken, Input, JobConfig, Scope};
    use crate::model::Model;
    use crate::types::AttributeType;
    use std::sync::Arc;

    fn people_model() -> Model {
        Model::parse(
            r#"{
                "attributes": {
                    "name": { "type": "string" },
                    "phone": { "type": "string" }
                },
                "resolvers": {
                    "name_or_phone_name": { "attributes": ["name"] },
                    "phone_only": { "attributes": ["phone"] }
                },
                "matchers": {
                    "simple": { "clause": "{ \"match\": { \"{{ field }}\": {{ value }} } }" }
                },
                "indices": {
                    "ppl": {
                        "fields": {
                            "name.keyword": { "attribute": "name", "matcher": "simple" },
                            "phone": { "attribute": "phone", "matcher": "simple" }
                        }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    fn seed(name: &str) -> BTreeMap<String, Attribute> {
        let mut attribute = Attribute::new("name", AttributeType::String);
        attribute.add_value(Value::create(AttributeType::String, &json!(name)));
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), attribute);
        attributes
    }

    fn job(backend: Arc<ScriptedBackend>, config: JobConfig) -> ResolutionJob {
        let input = Input::new(people_model(), seed("Alice"));
        ResolutionJob::new(backend, input).with_config(config)
    }

    fn parse(envelope: &str) -> Json {
        serde_json::from_str(envelope).unwrap()
    }

    #[test]
    fn test_zero_results_yields_empty_envelope() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut job = job(backend, JobConfig::default());
        let envelope = parse(&job.run().unwrap());
        assert_eq!(envelope["hits"]["total"], json!(0));
        assert_eq!(envelope["hits"]["hits"], json!([]));
        assert!(envelope.get("queries").is_none());
    }

    #[test]
    fn test_two_hop_traversal_links_documents() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_score": 1.5, "_source": {"name": "Alice", "phone": "555"}})],
        );
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d2", "_source": {"phone": "555"}})],
        );

        let mut job = job(backend.clone(), JobConfig::default());
        let envelope = parse(&job.run().unwrap());

        assert_eq!(envelope["hits"]["total"], json!(2));
        let hits = envelope["hits"]["hits"].as_array().unwrap();
        assert_eq!(hits[0]["_id"], json!("d1"));
        assert_eq!(hits[0]["_hop"], json!(0));
        assert!(hits[0].get("_score").is_none());
        assert_eq!(hits[1]["_id"], json!("d2"));
        assert_eq!(hits[1]["_hop"], json!(1));

        // The second query excludes the document seen on hop 0.
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        let second: Json = serde_json::from_str(&requests[1].body).unwrap();
        assert_eq!(
            second.pointer("/query/bool/must_not").unwrap(),
            &json!([{"ids": {"values": ["d1"]}}])
        );
    }

    #[test]
    fn test_harvest_falls_back_to_parent_path() {
        // The model queries name.keyword, but _source only has name.
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice"}})],
        );

        let mut job = job(backend, JobConfig::default());
        let envelope = parse(&job.run().unwrap());
        let hit = &envelope["hits"]["hits"][0];
        assert_eq!(hit["_attributes"]["name"], json!("Alice"));
    }

    #[test]
    fn test_exclude_scope_reaches_must_not() {
        let backend = Arc::new(ScriptedBackend::new());
        let mut exclude = BTreeMap::new();
        let mut bob = Attribute::new("name", AttributeType::String);
        bob.add_value(Value::create(AttributeType::String, &json!("Bob")));
        exclude.insert("name".to_string(), bob);

        let input = Input::new(people_model(), seed("Alice")).with_scope(Scope {
            include: BTreeMap::new(),
            exclude,
        });
        let mut job = ResolutionJob::new(backend.clone(), input);
        job.run().unwrap();

        let request: Json = serde_json::from_str(&backend.requests()[0].body).unwrap();
        let must_not = request.pointer("/query/bool/must_not").unwrap();
        assert_eq!(must_not, &json!([{"match": {"name.keyword": "Bob"}}]));
    }

    #[test]
    fn test_max_hops_zero_stops_after_one_hop() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice", "phone": "555"}})],
        );
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d2", "_source": {"phone": "555"}})],
        );

        let config = JobConfig {
            max_hops: 0,
            ..JobConfig::default()
        };
        let mut job = job(backend.clone(), config);
        let envelope = parse(&job.run().unwrap());

        // The phone discovered on hop 0 is never searched.
        assert_eq!(envelope["hits"]["total"], json!(1));
        assert_eq!(backend.requests().len(), 1);
    }

    #[test]
    fn test_unbounded_hops_run_to_saturation() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice", "phone": "555"}})],
        );

        let config = JobConfig {
            max_hops: -1,
            ..JobConfig::default()
        };
        let mut job = job(backend.clone(), config);
        let envelope = parse(&job.run().unwrap());
        assert_eq!(envelope["hits"]["total"], json!(1));
        // Hop 0 found new values, hop 1 found nothing, then the job stopped.
        assert_eq!(backend.requests().len(), 2);
    }

    #[test]
    fn test_duplicate_ids_in_response_are_deduplicated() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![
                json!({"_id": "d1", "_source": {"name": "Alice"}}),
                json!({"_id": "d1", "_source": {"name": "Alice"}}),
            ],
        );

        let mut job = job(backend, JobConfig::default());
        let envelope = parse(&job.run().unwrap());
        assert_eq!(envelope["hits"]["total"], json!(1));
    }

    #[test]
    fn test_reuse_resets_state() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice"}})],
        );
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice"}})],
        );

        let mut job = job(backend, JobConfig::default());
        let first = parse(&job.run().unwrap());
        let second = parse(&job.run().unwrap());
        assert_eq!(first["hits"], second["hits"]);
    }

    #[test]
    fn test_deterministic_envelopes() {
        let run = || {
            let backend = Arc::new(ScriptedBackend::new());
            backend.enqueue_hits(
                "ppl",
                vec![json!({"_id": "d1", "_source": {"name": "Alice", "phone": "555"}})],
            );
            let mut job = job(backend, JobConfig::default());
            job.run().unwrap()
        };
        let normalize = |envelope: String| {
            let mut parsed: Json = serde_json::from_str(&envelope).unwrap();
            parsed["took"] = json!(0);
            parsed.to_string()
        };
        assert_eq!(normalize(run()), normalize(run()));
    }

    #[test]
    fn test_query_log_strips_hit_documents() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_response(
            "ppl",
            json!({"took": 2, "hits": {"total": 1, "hits": [{"_id": "d1", "_source": {"name": "Alice"}}]}}),
        );

        let config = JobConfig {
            include_queries: true,
            ..JobConfig::default()
        };
        let mut job = job(backend, config);
        let envelope = parse(&job.run().unwrap());

        let queries = envelope["queries"].as_array().unwrap();
        assert_eq!(queries.len(), 1);
        let record = &queries[0];
        assert_eq!(record["_hop"], json!(0));
        assert_eq!(record["_index"], json!("ppl"));
        assert_eq!(record["resolvers"]["list"], json!(["name_or_phone_name"]));
        assert_eq!(record["resolvers"]["tree"], json!({"name": {}}));
        assert!(record["search"]["request"].get("query").is_some());
        assert!(record["search"]["response"]["hits"].get("hits").is_none());
        assert_eq!(record["search"]["response"]["hits"]["total"], json!(1));
    }

    #[test]
    fn test_hits_section_omitted_when_disabled() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice", "phone": "555"}})],
        );
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d2", "_source": {"phone": "555"}})],
        );

        let config = JobConfig {
            include_hits: false,
            ..JobConfig::default()
        };
        let mut job = job(backend.clone(), config);
        let envelope = parse(&job.run().unwrap());
        assert!(envelope.get("hits").is_none());
        // Harvesting still drives the traversal to the second hop.
        assert_eq!(backend.requests().len(), 2);
    }

    #[test]
    fn test_source_removed_when_disabled() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_id": "d1", "_source": {"name": "Alice"}})],
        );

        let config = JobConfig {
            include_source: false,
            include_attributes: false,
            ..JobConfig::default()
        };
        let mut job = job(backend, config);
        let envelope = parse(&job.run().unwrap());
        let hit = &envelope["hits"]["hits"][0];
        assert!(hit.get("_source").is_none());
        assert!(hit.get("_attributes").is_none());
    }

    #[test]
    fn test_index_scope_matches_post_filtering() {
        let two_index_model = || {
            Model::parse(
                r#"{
                    "attributes": {
                        "name": { "type": "string" },
                        "phone": { "type": "string" }
                    },
                    "resolvers": {
                        "name_only": { "attributes": ["name"] }
                    },
                    "matchers": {
                        "simple": { "clause": "{ \"match\": { \"{{ field }}\": {{ value }} } }" }
                    },
                    "indices": {
                        "ppl": {
                            "fields": {
                                "name.keyword": { "attribute": "name", "matcher": "simple" },
                                "phone": { "attribute": "phone", "matcher": "simple" }
                            }
                        },
                        "vips": {
                            "fields": {
                                "name": { "attribute": "name", "matcher": "simple" }
                            }
                        }
                    }
                }"#,
            )
            .unwrap()
        };

        // Unscoped run over both indices.
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_index": "ppl", "_id": "d1", "_source": {"name": "Alice", "phone": "555"}})],
        );
        backend.enqueue_hits(
            "vips",
            vec![json!({"_index": "vips", "_id": "v1", "_source": {"name": "Alice"}})],
        );
        let input = Input::new(two_index_model(), seed("Alice"));
        let mut unscoped = ResolutionJob::new(backend, input);
        let full = parse(&unscoped.run().unwrap());

        // Scoped run over ppl only, against the same ppl responses.
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_hits(
            "ppl",
            vec![json!({"_index": "ppl", "_id": "d1", "_source": {"name": "Alice", "phone": "555"}})],
        );
        let mut model = two_index_model();
        model.retain_indices(&["ppl".to_string()]).unwrap();
        let mut scoped_job = ResolutionJob::new(backend, Input::new(model, seed("Alice")));
        let scoped = parse(&scoped_job.run().unwrap());

        let filtered: Vec<&Json> = full["hits"]["hits"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|hit| hit["_index"] == json!("ppl"))
            .collect();
        let scoped_hits: Vec<&Json> =
            scoped["hits"]["hits"].as_array().unwrap().iter().collect();
        assert_eq!(scoped_hits, filtered);
    }

    #[test]
    fn test_backend_error_aborts_run() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.fail_next();
        let mut job = job(backend, JobConfig::default());
        let err = job.run().unwrap_err();
        assert!(matches!(err, ResolutionError::Backend(_)));
    }

    #[test]
    fn test_cancellation_stops_before_first_search() {
        let backend = Arc::new(ScriptedBackend::new());
        let cancel = CancelToken::new();
        cancel.cancel();
        let input = Input::new(people_model(), seed("Alice"));
        let mut job = ResolutionJob::new(backend.clone(), input).with_cancel_token(cancel);
        let err = job.run().unwrap_err();
        assert!(matches!(err, ResolutionError::Cancelled));
        assert!(backend.requests().is_empty());
    }
}
