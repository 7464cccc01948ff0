//! Data factory demo stack.
//!
//! A data factory wired to a blob storage account: input and output
//! containers, a linked service carrying the storage connection string, an
//! XML source dataset, a JSON sink dataset and one copy pipeline between
//! them.

use gantry_graph::{PropertyBag, PropertyValue, ResourceGraph, Template};
use tracing::info;

use crate::config::{StackConfig, StackResult};
use crate::registry::StackBuilder;

pub struct DataFactoryStack;

impl StackBuilder for DataFactoryStack {
    fn name(&self) -> &str {
        "data-factory"
    }

    fn description(&self) -> &str {
        "Data factory with an XML-to-JSON copy pipeline over blob storage"
    }

    fn build(&self, config: &StackConfig) -> StackResult<ResourceGraph> {
        let env = config.environment().to_string();
        let location = config.location().to_string();

        let mut graph = ResourceGraph::new(format!("data-factory-{}", env));
        info!("Building stack '{}'", graph.stack());

        let suffix = graph.declare(
            "random:RandomId",
            "resource-id",
            PropertyBag::new().set("byteLength", 2u64),
        )?;

        let group = graph.declare(
            "azure:resources:ResourceGroup",
            "rg-adf",
            PropertyBag::new()
                .set(
                    "name",
                    Template::new()
                        .text("rg-adf-")
                        .output(suffix.output("hex"))
                        .text("-")
                        .text(&env)
                        .build(),
                )
                .set("location", location.as_str()),
        )?;

        let factory = graph.declare(
            "azure:datafactory:Factory",
            "data-factory",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set(
                    "name",
                    Template::new()
                        .text("adf-")
                        .output(suffix.output("hex"))
                        .text("-")
                        .text(&env)
                        .build(),
                )
                .set(
                    "identity",
                    PropertyValue::object(vec![("type", "SystemAssigned".into())]),
                ),
        )?;

        // Storage account names allow lowercase alphanumerics only.
        let storage = graph.declare(
            "azure:storage:StorageAccount",
            "storage",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set(
                    "name",
                    Template::new()
                        .text("st")
                        .output(suffix.output("hex"))
                        .text(&env)
                        .build(),
                )
                .set("kind", "StorageV2")
                .set("minimumTlsVersion", "TLS1_2")
                .set("enableHttpsTrafficOnly", true)
                .set("allowBlobPublicAccess", false)
                .set(
                    "sku",
                    PropertyValue::object(vec![("name", "Standard_LRS".into())]),
                ),
        )?;

        let input = graph.declare(
            "azure:storage:BlobContainer",
            "input",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("accountName", storage.output("name"))
                .set("publicAccess", "None"),
        )?;
        let output = graph.declare(
            "azure:storage:BlobContainer",
            "output",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("accountName", storage.output("name"))
                .set("publicAccess", "None"),
        )?;

        let linked_service = graph.declare(
            "azure:datafactory:LinkedService",
            "storage-link",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("factoryName", factory.output("name"))
                .set(
                    "connectionString",
                    Template::new()
                        .text("DefaultEndpointsProtocol=https;AccountName=")
                        .output(storage.output("name"))
                        .text(";AccountKey=")
                        .output(storage.output("primaryKey"))
                        .build(),
                ),
        )?;

        let xml_dataset = graph.declare(
            "azure:datafactory:Dataset",
            "xml-input",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("factoryName", factory.output("name"))
                .set("linkedServiceName", linked_service.output("name"))
                .set("format", "Xml")
                .set(
                    "location",
                    PropertyValue::object(vec![
                        ("container", input.output("name").into()),
                        ("path", "incoming".into()),
                    ]),
                ),
        )?;
        let json_dataset = graph.declare(
            "azure:datafactory:Dataset",
            "json-output",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("factoryName", factory.output("name"))
                .set("linkedServiceName", linked_service.output("name"))
                .set("format", "Json")
                .set(
                    "location",
                    PropertyValue::object(vec![
                        ("container", output.output("name").into()),
                        ("path", "converted".into()),
                    ]),
                ),
        )?;

        graph.declare(
            "azure:datafactory:Pipeline",
            "xml-to-json",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("factoryName", factory.output("name"))
                .set(
                    "activities",
                    PropertyValue::array(vec![PropertyValue::object(vec![
                        ("name", "CopyXmlToJson".into()),
                        ("type", "Copy".into()),
                        (
                            "inputs",
                            PropertyValue::array(vec![PropertyValue::object(vec![(
                                "referenceName",
                                xml_dataset.output("name").into(),
                            )])]),
                        ),
                        (
                            "outputs",
                            PropertyValue::array(vec![PropertyValue::object(vec![(
                                "referenceName",
                                json_dataset.output("name").into(),
                            )])]),
                        ),
                        (
                            "typeProperties",
                            PropertyValue::object(vec![
                                (
                                    "source",
                                    PropertyValue::object(vec![("type", "XmlSource".into())]),
                                ),
                                (
                                    "sink",
                                    PropertyValue::object(vec![("type", "JsonSink".into())]),
                                ),
                            ]),
                        ),
                    ])]),
                ),
        )?;

        graph.export("factoryName", factory.output("name"))?;
        graph.export("storageAccountName", storage.output("name"))?;
        graph.export("primaryStorageKey", storage.output("primaryKey"))?;

        Ok(graph)
    }
}
