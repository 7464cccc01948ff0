//! IoT edge demo stack.
//!
//! A resource group, virtual network with an SSH-only security group, an
//! IoT hub on the free tier, and an edge VM reachable over a public IP with
//! a DNS label. Admin credentials come from config (username) and a
//! generated password resource.

use gantry_graph::{PropertyBag, PropertyValue, ResourceGraph, Template};
use tracing::info;

use crate::config::{StackConfig, StackResult};
use crate::registry::StackBuilder;

pub struct IotStack;

impl StackBuilder for IotStack {
    fn name(&self) -> &str {
        "iot"
    }

    fn description(&self) -> &str {
        "IoT hub with an edge VM behind an SSH-only network security group"
    }

    fn build(&self, config: &StackConfig) -> StackResult<ResourceGraph> {
        let env = config.environment().to_string();
        let location = config.location().to_string();
        let admin_username = config.require("edgeVM.adminUsername")?;

        let mut graph = ResourceGraph::new(format!("iot-{}", env));
        info!("Building stack '{}'", graph.stack());

        // Short random suffix shared by globally-unique resource names.
        let suffix = graph.declare(
            "random:RandomId",
            "resource-id",
            PropertyBag::new().set("byteLength", 2u64),
        )?;

        let group = graph.declare(
            "azure:resources:ResourceGroup",
            "rg-iot",
            PropertyBag::new()
                .set(
                    "name",
                    Template::new()
                        .text("rg-iot-")
                        .output(suffix.output("hex"))
                        .text("-")
                        .text(&env)
                        .build(),
                )
                .set("location", location.as_str()),
        )?;

        let nsg = graph.declare(
            "azure:network:NetworkSecurityGroup",
            "nsg-iot",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set(
                    "securityRules",
                    PropertyValue::array(vec![PropertyValue::object(vec![
                        ("name", "AllowSSH".into()),
                        ("priority", 100u64.into()),
                        ("direction", "Inbound".into()),
                        ("access", "Allow".into()),
                        ("protocol", "Tcp".into()),
                        ("sourcePortRange", "*".into()),
                        ("destinationPortRange", "22".into()),
                        ("sourceAddressPrefix", "*".into()),
                        ("destinationAddressPrefix", "*".into()),
                    ])]),
                ),
        )?;

        let vnet = graph.declare(
            "azure:network:VirtualNetwork",
            "vnet-iot",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set(
                    "addressSpace",
                    PropertyValue::object(vec![(
                        "addressPrefixes",
                        PropertyValue::array(vec!["10.0.1.0/24".into()]),
                    )]),
                ),
        )?;

        let subnet = graph.declare(
            "azure:network:Subnet",
            "subnet-iot",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("virtualNetworkName", vnet.output("name"))
                .set("addressPrefix", "10.0.1.0/28")
                .set(
                    "networkSecurityGroup",
                    PropertyValue::object(vec![("id", nsg.output("id").into())]),
                ),
        )?;

        let hub = graph.declare(
            "azure:iot:IoTHub",
            "iot-hub",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set(
                    "name",
                    Template::new()
                        .text("iot-demo-")
                        .output(suffix.output("hex"))
                        .text("-")
                        .text(&env)
                        .build(),
                )
                .set(
                    "sku",
                    PropertyValue::object(vec![
                        ("name", "F1".into()),
                        ("capacity", 1u64.into()),
                    ]),
                ),
        )?;

        let public_ip = graph.declare(
            "azure:network:PublicIPAddress",
            "pip-iot-edge-vm",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set("publicIPAllocationMethod", "Dynamic")
                .set(
                    "dnsSettings",
                    PropertyValue::object(vec![(
                        "domainNameLabel",
                        Template::new()
                            .text("iot-edge-vm-")
                            .output(suffix.output("hex"))
                            .build()
                            .into(),
                    )]),
                ),
        )?;

        let admin_password = graph.declare(
            "random:RandomPassword",
            "vm-admin-password",
            PropertyBag::new()
                .set("length", 16u64)
                .set("special", true)
                .set("overrideSpecial", "_%@"),
        )?;

        let nic = graph.declare(
            "azure:network:NetworkInterface",
            "nic-iot-edge-vm",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set(
                    "ipConfigurations",
                    PropertyValue::array(vec![PropertyValue::object(vec![
                        ("name", "ipconfig1".into()),
                        (
                            "subnet",
                            PropertyValue::object(vec![("id", subnet.output("id").into())]),
                        ),
                        (
                            "publicIPAddress",
                            PropertyValue::object(vec![("id", public_ip.output("id").into())]),
                        ),
                        ("privateIPAllocationMethod", "Dynamic".into()),
                    ])]),
                ),
        )?;

        let vm = graph.declare(
            "azure:compute:VirtualMachine",
            "vm-iot-edge",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set("name", format!("vm-iot-edge-{}", env))
                .set(
                    "hardwareProfile",
                    PropertyValue::object(vec![("vmSize", "Standard_B1s".into())]),
                )
                .set(
                    "storageProfile",
                    PropertyValue::object(vec![(
                        "imageReference",
                        PropertyValue::object(vec![
                            ("publisher", "Canonical".into()),
                            ("offer", "UbuntuServer".into()),
                            ("sku", "18.04-LTS".into()),
                            ("version", "latest".into()),
                        ]),
                    )]),
                )
                .set(
                    "osProfile",
                    PropertyValue::object(vec![
                        ("computerName", format!("vm-iot-edge-{}", env).into()),
                        ("adminUsername", admin_username.as_str().into()),
                        ("adminPassword", admin_password.output("result").into()),
                    ]),
                )
                .set(
                    "networkProfile",
                    PropertyValue::object(vec![(
                        "networkInterfaces",
                        PropertyValue::array(vec![PropertyValue::object(vec![(
                            "id",
                            nic.output("id").into(),
                        )])]),
                    )]),
                ),
        )?;

        graph.declare(
            "azure:compute:VirtualMachineExtension",
            "install-iot-edge-runtime",
            PropertyBag::new()
                .set("resourceGroupName", group.output("name"))
                .set("location", location.as_str())
                .set("vmName", vm.output("name"))
                .set("publisher", "Microsoft.Azure.Extensions")
                .set("type", "CustomScript")
                .set("typeHandlerVersion", "2.1")
                .set(
                    "settings",
                    PropertyValue::object(vec![(
                        "script",
                        "curl -sSL https://aka.ms/iotedge-install | bash".into(),
                    )]),
                ),
        )?;

        graph.export("adminUsername", admin_username.as_str())?;
        graph.export("adminPassword", admin_password.output("result"))?;
        graph.export("publicIp", public_ip.output("ipAddress"))?;
        graph.export("fqdn", public_ip.output("fqdn"))?;
        graph.export("iotHubName", hub.output("name"))?;

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackError;

    fn config() -> StackConfig {
        StackConfig::new("dev", "westeurope").with_value("edgeVM.adminUsername", "gantry")
    }

    #[test]
    fn test_iot_stack_builds_and_freezes() {
        let graph = IotStack.build(&config()).unwrap();
        assert_eq!(graph.stack(), "iot-dev");
        assert_eq!(graph.len(), 11);
        assert!(graph.get("iot-hub").is_some());
        graph.freeze().unwrap();
    }

    #[test]
    fn test_extension_waits_only_on_group_and_vm() {
        let graph = IotStack.build(&config()).unwrap();
        let group = graph.get("rg-iot").unwrap().id;
        let vm = graph.get("vm-iot-edge").unwrap().id;
        let extension = graph.get("install-iot-edge-runtime").unwrap().id;

        let frozen = graph.freeze().unwrap();
        assert_eq!(frozen.dependencies(extension), &[group, vm]);
    }

    #[test]
    fn test_iot_stack_requires_admin_username() {
        let err = IotStack
            .build(&StackConfig::new("dev", "westeurope"))
            .unwrap_err();
        assert!(matches!(err, StackError::MissingConfig(key) if key == "edgeVM.adminUsername"));
    }
}
