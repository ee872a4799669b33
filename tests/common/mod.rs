#![allow(dead_code)]

use prometheus::proto::{Metric, MetricFamily};
use prometheus::Registry;

pub fn gather(registry: &Registry) -> Vec<MetricFamily> {
    registry.gather()
}

pub fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
    families
        .iter()
        .find(|f| f.get_name() == name)
        .unwrap_or_else(|| panic!("metric family {name} not gathered"))
}

pub fn series<'a>(family: &'a MetricFamily, labels: &[(&str, &str)]) -> &'a Metric {
    family
        .get_metric()
        .iter()
        .find(|m| {
            m.get_label().len() == labels.len()
                && labels.iter().all(|(k, v)| {
                    m.get_label()
                        .iter()
                        .any(|p| p.get_name() == *k && p.get_value() == *v)
                })
        })
        .unwrap_or_else(|| panic!("series {labels:?} not found in {}", family.get_name()))
}

pub fn counter(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> f64 {
    let families = gather(registry);
    series(family(&families, name), labels).get_counter().get_value()
}

pub fn gauge(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> f64 {
    let families = gather(registry);
    series(family(&families, name), labels).get_gauge().get_value()
}
