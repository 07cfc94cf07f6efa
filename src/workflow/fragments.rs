//! PHP snippets generated from a decoded workflow diagram.

use crate::feed::{Stage, State, Transition};
use indexmap::IndexMap;

/// Something that becomes a class constant: a state or a transition.
pub trait ConstantSource {
    fn constant_name(&self) -> &str;
    fn constant_value(&self) -> &str;
    fn constant_doc(&self) -> &str;
}

impl ConstantSource for State {
    fn constant_name(&self) -> &str {
        &self.name
    }

    fn constant_value(&self) -> &str {
        &self.id
    }

    fn constant_doc(&self) -> &str {
        &self.description
    }
}

impl ConstantSource for Transition {
    fn constant_name(&self) -> &str {
        &self.name
    }

    fn constant_value(&self) -> &str {
        &self.id
    }

    fn constant_doc(&self) -> &str {
        &self.description
    }
}

pub fn constants<C: ConstantSource>(entries: &[C]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "\n    /** {} */\n    const {} = '{}';",
                entry.constant_doc(),
                entry.constant_name(),
                entry.constant_value()
            )
        })
        .collect()
}

fn property(name: &str, value: &str) -> String {
    format!("\n            \"{name}\" => {value}")
}

fn php_array(items: &[String]) -> String {
    if items.is_empty() {
        return "Array()".to_owned();
    }
    format!("Array(\"{}\")", items.join("\",\""))
}

/// The `$transitions` entries: `nr` always, then the hooks and `ask` when set.
pub fn transitions(transitions: &[Transition]) -> String {
    transitions
        .iter()
        .map(|transition| {
            let mut properties = vec![property("nr", if transition.nr { "true" } else { "false" })];
            for (stage, method) in &transition.methods {
                properties.push(property(&stage.to_string(), &format!("\"{method}\"")));
            }
            if let Some(ask) = &transition.ask {
                properties.push(property("ask", &php_array(ask)));
            }
            format!(
                "\n        self::{} => Array({}\n        )",
                transition.name,
                properties.join(",")
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub fn cycle(transitions: &[Transition]) -> String {
    transitions
        .iter()
        .map(|transition| {
            format!(
                "\n        Array(\n            \"e1\" => self::{},\n            \"e2\" => self::{},\n            \"t\"  => self::{}\n        )",
                transition.from, transition.to, transition.name
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn abstract_method(method: &str, stage: Stage, transition: &Transition) -> String {
    let parameters = if stage.runs_before_change() {
        "$nextStep, $currentStep, $confirmationMessage=''"
    } else {
        "$currentStep, $previousStep, $confirmationMessage=''"
    };
    format!(
        "\n    /**\n     * {stage} for {} ({})\n     *    from {} to {}\n     */\n    public abstract function {method}({parameters});",
        transition.name, transition.description, transition.from, transition.to
    )
}

/// One abstract declaration per hook method. A method named by several
/// transitions keeps its first position and the documentation of its last use.
pub fn abstract_methods(transitions: &[Transition]) -> String {
    let mut methods: IndexMap<&str, (Stage, &Transition)> = IndexMap::new();
    for transition in transitions {
        for (stage, method) in &transition.methods {
            methods.insert(method.as_str(), (*stage, transition));
        }
    }
    methods
        .iter()
        .map(|(method, (stage, transition))| abstract_method(method, *stage, transition))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn activities(states: &[State]) -> String {
    states
        .iter()
        .filter(|state| state.activity.is_some())
        .map(|state| format!("\n            self::{} => '{}_activity'", state.name, state.id))
        .collect::<Vec<_>>()
        .join(",")
}

/// Gettext stub listing every translatable workflow label.
pub fn locales(states: &[State], transitions: &[Transition]) -> String {
    let mut out = String::from("<?php");
    for state in states {
        out.push_str(&format!(
            "\n    // _COMMENT: (state) {} : {}\n    $i18n = _(\"{}\");",
            state.name, state.description, state.id
        ));
        if let Some(activity) = &state.activity {
            out.push_str(&format!(
                "\n    // _COMMENT: (activity) {} : {activity}\n    $i18n = _(\"{}_activity\");",
                state.name, state.id
            ));
        }
    }
    for transition in transitions {
        out.push_str(&format!(
            "\n    // _COMMENT: (transition) {} : {}\n    $i18n = _(\"{}\");",
            transition.name, transition.description, transition.id
        ));
    }
    out.push('\n');
    out
}
