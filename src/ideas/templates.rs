//! Scaffold hints for an app idea: modules, env vars, routes, data models.
//!
//! Every list is de-duplicated and keeps first-seen order.

use serde::Serialize;

use super::AppIdea;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSpec {
    pub template_name: String,
    pub modules: Vec<String>,
    pub env_vars: Vec<String>,
    pub routes: Vec<String>,
    pub data_models: Vec<String>,
}

const MODULE_MAPPINGS: &[(&str, &[&str])] = &[
    ("wallet-connect", &["wallet-connect", "web3-provider"]),
    ("tx-simulator", &["indexer", "rpc-client"]),
    ("ui-kit", &["ui-kit", "react-components"]),
    ("indexer", &["indexer", "db"]),
    ("chart-lib", &["chart-lib", "data-viz"]),
    ("bridge-api", &["bridge-api", "cross-chain"]),
    ("notification", &["notification", "push-service"]),
    ("strategy-builder", &["visual-builder", "strategy-engine"]),
    ("backtesting", &["backtesting", "data-engine"]),
    ("marketplace", &["marketplace", "payment"]),
    ("agent-runtime", &["agent-runtime", "ai-engine"]),
    ("ai-agent", &["ai-agent", "decision-engine"]),
    ("defi-protocols", &["defi-protocols", "yield-tracker"]),
    ("pool-analytics", &["pool-analytics", "liquidity-math"]),
    ("rebalancer", &["rebalancer", "transaction-builder"]),
    ("staking-api", &["staking-api", "validator-client"]),
    ("analytics", &["analytics", "metrics"]),
    ("risk-analytics", &["risk-analytics", "scoring-engine"]),
    ("frame-builder", &["frame-builder", "visual-editor"]),
    ("farcaster-api", &["farcaster-api", "social-protocol"]),
];

// Keyed by template hint, not by mapped module.
const ENV_VAR_MAPPINGS: &[(&str, &[&str])] = &[
    ("wallet-connect", &["WALLET_CONNECT_PROJECT_ID"]),
    ("indexer", &["RPC_URL", "INDEXER_URL"]),
    ("rpc-client", &["RPC_URL", "CHAIN_IDS"]),
    ("bridge-api", &["BRIDGE_API_KEY", "SUPPORTED_CHAINS"]),
    ("notification", &["PUSH_SERVICE_KEY", "WEBHOOK_URL"]),
    ("ai-engine", &["AI_MODEL_URL", "AI_API_KEY"]),
    ("defi-protocols", &["PROTOCOL_APIS", "RPC_URLS"]),
    ("staking-api", &["BEACON_NODE_URL", "VALIDATOR_KEYS"]),
    ("farcaster-api", &["FARCASTER_API_KEY", "HUB_URL"]),
    ("payment", &["STRIPE_KEY", "PAYMENT_WEBHOOK"]),
];

const ROUTE_KEYWORDS: &[(&str, &str)] = &[
    ("connect", "/connect"),
    ("wallet", "/wallet"),
    ("simulate", "/simulate"),
    ("compare", "/compare"),
    ("execute", "/execute"),
    ("browse", "/browse"),
    ("view", "/dashboard"),
    ("track", "/tracking"),
    ("monitor", "/monitoring"),
    ("analyze", "/analytics"),
    ("design", "/builder"),
    ("deploy", "/deploy"),
    ("test", "/testing"),
    ("subscribe", "/subscription"),
    ("manage", "/management"),
];

const MODEL_KEYWORDS: &[(&str, &str)] = &[
    ("transaction", "Transaction"),
    ("simulate", "TransactionSimulation"),
    ("bridge", "BridgeTransaction"),
    ("gas", "GasFee"),
    ("price", "PriceData"),
    ("pool", "LiquidityPool"),
    ("yield", "YieldStrategy"),
    ("portfolio", "Portfolio"),
    ("position", "Position"),
    ("strategy", "TradingStrategy"),
    ("agent", "Agent"),
    ("bot", "Bot"),
    ("operator", "Operator"),
    ("validator", "Validator"),
    ("frame", "Frame"),
    ("tip", "Tip"),
    ("notification", "Notification"),
    ("alert", "Alert"),
    ("report", "Report"),
];

fn lookup(table: &[(&str, &'static [&'static str])], key: &str) -> Option<&'static [&'static str]> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn push_unique(out: &mut Vec<String>, item: &str) {
    if !out.iter().any(|x| x == item) {
        out.push(item.to_string());
    }
}

fn routes_for(flow: &[&str]) -> Vec<String> {
    let mut routes = vec!["/".to_string()];
    for step in flow {
        let step = step.to_lowercase();
        for (kw, route) in ROUTE_KEYWORDS {
            if step.contains(kw) {
                push_unique(&mut routes, route);
            }
        }
    }
    routes
}

fn data_models_for(title: &str, flow: &[&str]) -> Vec<String> {
    let text = format!("{} {}", title, flow.join(" ")).to_lowercase();
    let mut models = vec!["User".to_string()];
    for (kw, model) in MODEL_KEYWORDS {
        if text.contains(kw) {
            push_unique(&mut models, model);
        }
    }
    models
}

pub fn template_spec(idea: &AppIdea) -> TemplateSpec {
    let mut modules = Vec::new();
    let mut env_vars = Vec::new();
    for hint in idea.minidev_template_hint {
        match lookup(MODULE_MAPPINGS, hint) {
            Some(mapped) => mapped.iter().for_each(|m| push_unique(&mut modules, m)),
            None => push_unique(&mut modules, hint),
        }
        for v in lookup(ENV_VAR_MAPPINGS, hint).unwrap_or_default() {
            push_unique(&mut env_vars, v);
        }
    }

    TemplateSpec {
        template_name: idea
            .idea_title
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_lowercase(),
        modules,
        env_vars,
        routes: routes_for(idea.core_user_flow),
        data_models: data_models_for(idea.idea_title, idea.core_user_flow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ideas::patterns::patterns_for;

    #[test]
    fn cost_optimizer_scaffold() {
        let idea = patterns_for("Layer 2 Scaling")[0].idea;
        let spec = template_spec(&idea);

        assert_eq!(spec.template_name, "l2costoptimizer");
        assert_eq!(
            spec.modules,
            ["wallet-connect", "web3-provider", "indexer", "rpc-client", "ui-kit", "react-components"]
        );
        // "tx-simulator" has no env mapping of its own.
        assert_eq!(spec.env_vars, ["WALLET_CONNECT_PROJECT_ID"]);
        assert_eq!(
            spec.routes,
            ["/", "/connect", "/wallet", "/simulate", "/execute"]
        );
        assert_eq!(
            spec.data_models,
            ["User", "Transaction", "TransactionSimulation"]
        );
    }

    #[test]
    fn unmapped_hint_is_kept_verbatim() {
        let idea = AppIdea {
            idea_title: "X-Ray!",
            one_liner: "",
            target_user: "",
            core_user_flow: &[],
            minidev_template_hint: &["custom-module", "indexer", "indexer"],
        };
        let spec = template_spec(&idea);
        assert_eq!(spec.template_name, "xray");
        assert_eq!(spec.modules, ["custom-module", "indexer", "db"]);
        assert_eq!(spec.env_vars, ["RPC_URL", "INDEXER_URL"]);
        assert_eq!(spec.routes, ["/"]);
        assert_eq!(spec.data_models, ["User"]);
    }
}
