//! Server-side rendering of the chat page.
//!
//! The page works without JavaScript (presets are links, the input is a plain
//! form). The inline script upgrades it: presets fill the input in place and
//! submissions go over the WebSocket so the reply streams in.

use mindful_core::{Role, Turn};
use std::fmt::Write;

/// Prompts offered in the sidebar. Choosing one fills the input; it is never
/// sent automatically.
pub const PRESET_PROMPTS: [&str; 5] = [
    "I'm feeling anxious about work. What can I do?",
    "How can I practice mindfulness daily?",
    "I'm having trouble sleeping. Any tips?",
    "What are some ways to build self-esteem?",
    "I feel overwhelmed. Help me prioritize.",
];

/// Preset prompt by zero-based index.
pub fn preset_prompt(index: usize) -> Option<&'static str> {
    PRESET_PROMPTS.get(index).copied()
}

const TITLE: &str = "Mental Wellness Chatbot";
const INPUT_PLACEHOLDER: &str = "How are you feeling today?";

const DISCLAIMER: &str = r#"<p><strong>Important Note on Mental Health:</strong><br>
This chatbot is designed to provide general support, empathy, and coping strategies based on common mental wellness practices. It is not a substitute for professional medical advice, diagnosis, or treatment. If you are experiencing a mental health crisis, please seek help from a qualified professional or contact emergency services immediately.</p>
<p>Some helpful resources:</p>
<ul>
<li>National Suicide Prevention Lifeline (US): 988</li>
<li>Crisis Text Line: Text HOME to 741741</li>
<li>For international help: Visit <a href="https://www.befrienders.org">https://www.befrienders.org</a></li>
</ul>
<p>Remember, taking care of your mental health is important. Practice self-compassion, mindfulness, and reach out to loved ones when needed.</p>"#;

const STYLESHEET: &str = r#"
body { margin: 0; display: flex; min-height: 100vh; background-color: #f0f4f8; color: #333333; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; }
.sidebar { width: 280px; flex-shrink: 0; background-color: #ffffff; border-right: 1px solid #e0e0e0; padding: 16px; }
.sidebar ul { list-style: none; padding: 0; }
.sidebar a.preset { display: block; margin-bottom: 8px; background-color: #4caf50; color: white; border-radius: 8px; padding: 8px 16px; text-decoration: none; }
.sidebar a.preset:hover { background-color: #388e3c; }
main { flex: 1; max-width: 860px; padding: 16px 32px; }
.info { background-color: #e8f5e9; border-left: 5px solid #4caf50; padding: 12px; border-radius: 8px; }
.chat-message { border-radius: 12px; padding: 12px; margin-bottom: 12px; white-space: pre-wrap; }
.chat-message .role { display: block; font-weight: 600; margin-bottom: 4px; }
.chat-message.user { background-color: #e3f2fd; color: #1565c0; }
.chat-message.assistant { background-color: #ffffff; color: #333333; border: 1px solid #e0e0e0; }
.chat-message.error, .blocking { background-color: #fdecea; color: #b71c1c; border: 1px solid #f5c6cb; }
.blocking { border-radius: 8px; padding: 12px; margin: 16px 0; }
#thinking { font-style: italic; color: #666666; margin-bottom: 12px; }
#chat-form { display: flex; gap: 8px; }
#chat-form input { flex: 1; padding: 10px; border-radius: 8px; border: 1px solid #cccccc; }
#chat-form button { background-color: #4caf50; color: white; border: none; border-radius: 8px; padding: 8px 16px; }
#chat-form button:disabled { background-color: #9e9e9e; }
"#;

const SCRIPT: &str = r#"
(function () {
  var form = document.getElementById('chat-form');
  var input = document.getElementById('message');
  var transcript = document.getElementById('transcript');
  var thinking = document.getElementById('thinking');

  document.querySelectorAll('a.preset').forEach(function (link) {
    link.addEventListener('click', function (event) {
      if (!input) { return; }
      event.preventDefault();
      input.value = link.dataset.prompt;
      input.focus();
    });
  });

  if (!form) { return; }
  var button = form.querySelector('button');
  form.addEventListener('submit', function () { thinking.hidden = false; });
  if (!window.WebSocket || !window.fetch) { return; }

  function bubble(role, text) {
    var div = document.createElement('div');
    div.className = 'chat-message ' + role;
    var label = document.createElement('span');
    label.className = 'role';
    label.textContent = role === 'user' ? 'You' : (role === 'assistant' ? 'Assistant' : 'Error');
    var content = document.createElement('div');
    content.className = 'content';
    content.textContent = text;
    div.appendChild(label);
    div.appendChild(content);
    transcript.appendChild(div);
    window.scrollTo(0, document.body.scrollHeight);
    return content;
  }

  function refresh(then) {
    fetch('/api/transcript', { credentials: 'same-origin' })
      .then(function (resp) { return resp.json(); })
      .then(function (data) {
        transcript.innerHTML = '';
        data.turns.forEach(function (turn) { bubble(turn.role, turn.content); });
        if (then) { then(); }
      });
  }

  var pending = null;
  function settle() {
    thinking.hidden = true;
    button.disabled = false;
    pending = null;
  }

  var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var socket = new WebSocket(scheme + location.host + '/ws');

  socket.addEventListener('close', function () {
    var interrupted = button.disabled;
    settle();
    if (interrupted) { bubble('error', 'Connection lost. Reload the page to see the reply.'); }
  });

  socket.addEventListener('open', function () {
    form.addEventListener('submit', function (event) {
      // Without a live socket the plain form POST takes over.
      if (socket.readyState !== WebSocket.OPEN) { return; }
      event.preventDefault();
      var text = input.value;
      if (!text.trim()) { thinking.hidden = true; return; }
      bubble('user', text);
      socket.send(JSON.stringify({ content: text }));
      input.value = '';
    });
  });

  socket.addEventListener('message', function (event) {
    var msg = JSON.parse(event.data);
    switch (msg.type) {
      case 'thinking':
        thinking.hidden = false;
        button.disabled = true;
        pending = null;
        break;
      case 'delta':
        if (!pending) { pending = bubble('assistant', ''); }
        pending.textContent += msg.text;
        break;
      case 'response':
      case 'ignored':
        settle();
        refresh();
        break;
      case 'notice':
        settle();
        bubble('error', msg.content);
        break;
      case 'error':
        settle();
        if (msg.kind === 'configuration') { location.reload(); return; }
        refresh(function () { bubble('error', msg.content); });
        break;
    }
  });
})();
"#;

/// Everything the page shows for one render.
#[derive(Debug, Default)]
pub struct PageView<'a> {
    /// The session's turns, oldest first.
    pub turns: &'a [Turn],
    /// Text placed in the input field (a chosen preset prompt).
    pub prefill: Option<&'a str>,
    /// Inline error shown after the transcript, in place of a reply.
    pub notice: Option<&'a str>,
    /// Blocking configuration error; hides the input form.
    pub config_error: Option<&'a str>,
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    }
}

fn push_message(html: &mut String, class: &str, label: &str, content: &str) {
    let _ = write!(
        html,
        r#"<div class="chat-message {class}"><span class="role">{label}</span><div class="content">{}</div></div>"#,
        escape_html(content)
    );
}

/// Renders the full chat page.
pub fn render(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(8 * 1024);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{TITLE}</title>
<style>{STYLESHEET}</style>
</head>
<body>
<aside class="sidebar">
<h2>Quick Start Prompts</h2>
<ul>
"#
    );

    for (index, prompt) in PRESET_PROMPTS.iter().enumerate() {
        let prompt = escape_html(prompt);
        let _ = writeln!(
            html,
            r#"<li><a class="preset" href="/?preset={index}" data-prompt="{prompt}">{prompt}</a></li>"#
        );
    }

    let _ = write!(
        html,
        r#"</ul>
</aside>
<main>
<h1>🧠 {TITLE}</h1>
<section class="info">
{DISCLAIMER}
</section>
"#
    );

    if let Some(error) = view.config_error {
        let _ = writeln!(
            html,
            r#"<div class="blocking" id="config-error" role="alert">{}</div>"#,
            escape_html(error)
        );
    }

    html.push_str("<div id=\"transcript\">\n");
    for turn in view.turns {
        push_message(&mut html, turn.role().as_str(), role_label(turn.role()), turn.content());
        html.push('\n');
    }
    if let Some(notice) = view.notice {
        push_message(&mut html, "error", "Error", notice);
        html.push('\n');
    }
    html.push_str("</div>\n");

    if view.config_error.is_none() {
        let _ = write!(
            html,
            r#"<div id="thinking" hidden>Thinking...</div>
<form id="chat-form" method="post" action="/chat">
<input id="message" name="message" placeholder="{INPUT_PLACEHOLDER}" value="{}" autocomplete="off" autofocus>
<button type="submit">Send</button>
</form>
"#,
            escape_html(view.prefill.unwrap_or_default())
        );
    }

    let _ = write!(
        html,
        r#"</main>
<script>{SCRIPT}</script>
</body>
</html>
"#
    );

    html
}
