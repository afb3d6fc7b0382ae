//! Server-side page.

use sd_dashboard::ControllerOptions;
use sd_types::{ConnectionPhase, DashboardSnapshot, HistoryRow, HistoryStatus};

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2rem; }
.par { display: flex; gap: 2rem; }
.p1, .p2 { flex: 1; }
.btn { padding: 0.4rem 1rem; cursor: pointer; }
.btn-approve { background: #f5c542; }
.btn-harvest { margin-left: 1rem; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 0.25rem 0.75rem; }
"#;

pub(crate) fn page(view: &DashboardSnapshot, defaults: &ControllerOptions) -> String {
    let body = match view.phase {
        ConnectionPhase::Connected => dashboard(view, defaults),
        ConnectionPhase::Connecting => connecting(view),
        ConnectionPhase::Disconnected => connect_buttons(),
    };
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Final Test</title><style>{STYLE}</style></head>
<body>
<div class="App">
<h2>Final Test</h2>
{body}
</div>
</body>
</html>
"#
    )
}

fn connect_buttons() -> String {
    format!(
        "<div>\n{}\n<br />\n{}\n</div>",
        connect_form("injected", "MetaMask"),
        connect_form("relay", "WalletConnect"),
    )
}

fn connect_form(strategy: &str, label: &str) -> String {
    format!(
        r#"<form method="post" action="/connect/{strategy}"><button class="btn btn-connect">{label}</button></form>"#
    )
}

fn connecting(view: &DashboardSnapshot) -> String {
    let pairing = match &view.pairing_uri {
        Some(uri) => format!(
            r#"<p>Scan or paste into your wallet:</p><pre class="pairing-uri">{}</pre>"#,
            escape(uri)
        ),
        None => String::new(),
    };
    format!(
        concat!(
            r#"<div class="connecting"><p>Connecting&hellip;</p>{}"#,
            r#"<p><a href="/">Refresh</a></p></div>"#
        ),
        pairing
    )
}

fn dashboard(view: &DashboardSnapshot, defaults: &ControllerOptions) -> String {
    let stake_controls = if view.show_stake_controls {
        format!(
            r#"<div class="line3">
{}
<br />
{}
</div>"#,
            action_form("deposit", "Deposit", Some(defaults.deposit_amount.as_str())),
            action_form("withdraw", "Withdraw", Some(defaults.withdraw_amount.as_str())),
        )
    } else {
        format!("<div>{}</div>", action_form("approve", "Approve", None))
    };

    format!(
        r#"<div class="par">
<div class="p1">
<div class="line1">
<p>Wallet address: {short}</p>
<p>Balance: {balance} WETH</p>
</div>
<div class="line2">
<p>Token earned: {earned} DD2</p>
{harvest}
</div>
<div class="s2">
{stake_controls}
</div>
<div>
<p>Your stake: {staked} WETH</p>
<p>Total staked: {total} WETH</p>
</div>
</div>
<div class="p2">
{history}
</div>
</div>"#,
        short = escape(view.short_account.as_deref().unwrap_or_default()),
        balance = slot(&view.balance),
        earned = slot(&view.token_earned),
        harvest = action_form("harvest", "Harvest", None),
        staked = slot(&view.token_staked),
        total = slot(&view.total_staked),
        history = history(&view.history),
    )
}

fn action_form(action: &str, label: &str, placeholder: Option<&str>) -> String {
    let input = match placeholder {
        Some(hint) => format!(
            r#"<input name="amount" inputmode="decimal" placeholder="{}" /> "#,
            escape(hint)
        ),
        None => String::new(),
    };
    let class = match action {
        "approve" => "btn btn-approve",
        "harvest" => "btn btn-harvest",
        _ => "btn btn-connect",
    };
    format!(
        r#"<form method="post" action="/stake/{action}">{input}<button class="{class}">{label}</button></form>"#
    )
}

fn history(status: &HistoryStatus) -> String {
    match status {
        HistoryStatus::Loading => String::new(),
        HistoryStatus::Failed { message } => format!("<pre>{}</pre>", escape(message)),
        HistoryStatus::Loaded { rows } => {
            let body: String = rows
                .iter()
                .enumerate()
                .map(|(idx, row)| history_row(idx, row))
                .collect();
            format!(
                r#"<table>
<thead><tr><th>#</th><th>Event</th><th>Amount</th><th>Time</th></tr></thead>
<tbody>
{body}</tbody>
</table>"#
            )
        }
    }
}

fn history_row(idx: usize, row: &HistoryRow) -> String {
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        idx + 1,
        escape(&row.event_type),
        escape(&row.amount),
        escape(&row.date)
    )
}

fn slot(value: &Option<String>) -> String {
    escape(value.as_deref().unwrap_or_default())
}

pub(crate) fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}
