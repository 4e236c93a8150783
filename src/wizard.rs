use crate::config::{self, Config, EditOutcome, Proxy};
use anyhow::Result;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

pub trait Prompter {
    /// Ask until `validate` accepts the answer.
    fn input(&mut self, prompt: &str, validate: &dyn Fn(&str) -> Result<(), String>) -> Result<String>;
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn input(&mut self, prompt: &str, validate: &dyn Fn(&str) -> Result<(), String>) -> Result<String> {
        let value: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|value: &String| validate(value))
            .interact_text()?;
        Ok(value)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(answer)
    }
}

/// One prompt of the proxy setup: what to ask, how to check the answer and
/// where to store it.
struct Station {
    prompt: &'static str,
    validate: fn(&Config, &Proxy, &str) -> Result<(), String>,
    assign: fn(&mut Proxy, &str),
}

fn stations() -> Vec<Station> {
    vec![
        Station {
            prompt: "Environment",
            validate: |config, _, env| {
                config::validate_env(env)?;
                if config.proxies.iter().any(|proxy| proxy.env == env) {
                    return Err(format!("{env} is already configured"));
                }
                Ok(())
            },
            assign: |proxy, env| proxy.env = env.to_string(),
        },
        Station {
            prompt: "Proxy Address (with http protocol)",
            validate: |_, _, address| config::validate_address(address.trim()),
            assign: |proxy, address| proxy.address = address.trim().to_string(),
        },
        Station {
            prompt: "Auth Connector",
            validate: |_, _, _| Ok(()),
            assign: |proxy, connector| proxy.auth_connector = connector.trim().to_string(),
        },
        Station {
            prompt: "Username (teleport username)",
            validate: |_, proxy, user_name| config::validate_identity(&proxy.auth_connector, user_name),
            assign: |proxy, user_name| proxy.user_name = user_name.trim().to_string(),
        },
        Station {
            prompt: "Is Need 2FA (Y/y/N/n)",
            validate: |_, _, answer| match answer {
                "Y" | "y" | "N" | "n" => Ok(()),
                _ => Err("invalid formatting".to_string()),
            },
            assign: |proxy, answer| proxy.two_fa = matches!(answer, "Y" | "y"),
        },
    ]
}

/// Walk every station in order. The first prompt that fails aborts the setup.
pub fn run_proxy_setup(config: &Config, prompter: &mut impl Prompter) -> Result<Proxy> {
    let mut proxy = Proxy::default();
    for station in stations() {
        let answer = prompter.input(station.prompt, &|value| (station.validate)(config, &proxy, value))?;
        (station.assign)(&mut proxy, &answer);
    }
    tracing::info!(env = %proxy.env, "proxy setup completed");
    Ok(proxy)
}

/// Re-open the editor on rejected text for as long as the user wants to keep
/// fixing it. Returns the new config, or `None` when nothing is to be saved.
pub fn edit_until_valid(
    initial: String,
    prompter: &mut impl Prompter,
    mut edit: impl FnMut(&str) -> Result<String>,
    apply: impl Fn(&str) -> EditOutcome,
) -> Result<Option<Config>> {
    let mut text = initial;
    loop {
        let edited = edit(&text)?;
        match apply(&edited) {
            EditOutcome::Changed(config) => return Ok(Some(config)),
            EditOutcome::Unchanged => return Ok(None),
            EditOutcome::Invalid(err) => {
                tracing::warn!(error = %err, "edited configuration rejected");
                eprintln!("Invalid configuration: {err}");
                if !prompter.confirm("Do you want to continue edit")? {
                    return Ok(None);
                }
                text = edited;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<&'static str>,
        confirms: VecDeque<bool>,
        rejected: Vec<String>,
    }

    impl Scripted {
        fn answers(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Prompter for Scripted {
        fn input(&mut self, prompt: &str, validate: &dyn Fn(&str) -> Result<(), String>) -> Result<String> {
            while let Some(answer) = self.answers.pop_front() {
                match validate(answer) {
                    Ok(()) => return Ok(answer.to_string()),
                    Err(_) => self.rejected.push(format!("{prompt}: {answer}")),
                }
            }
            Err(anyhow!("no answer for {prompt}"))
        }

        fn confirm(&mut self, _prompt: &str) -> Result<bool> {
            self.confirms.pop_front().ok_or_else(|| anyhow!("no confirmation left"))
        }
    }

    #[test]
    fn dialoguer_prompter_defaults_to_colorful_theme() {
        fn assert_default<T: Default>() {}
        assert_default::<DialoguerPrompter>();
        let _ = DialoguerPrompter::new();
    }

    #[test]
    fn setup_fills_every_field() {
        let mut prompter = Scripted::answers(&["prod", "https://proxy.prod:3080", "okta", "", "y"]);
        let proxy = run_proxy_setup(&Config::default(), &mut prompter).unwrap();
        assert_eq!(
            proxy,
            Proxy {
                env: "prod".to_string(),
                address: "https://proxy.prod:3080".to_string(),
                auth_connector: "okta".to_string(),
                user_name: String::new(),
                two_fa: true,
            }
        );
        assert!(prompter.rejected.is_empty());
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let mut prompter = Scripted::answers(&[
            "",
            "qa",
            "qa.example.com",
            "http://qa.example.com",
            "",
            "",
            "alice",
            "maybe",
            "N",
        ]);
        let proxy = run_proxy_setup(&Config::default(), &mut prompter).unwrap();
        assert_eq!(proxy.env, "qa");
        assert_eq!(proxy.user_name, "alice");
        assert!(!proxy.two_fa);
        assert_eq!(
            prompter.rejected,
            vec![
                "Environment: ",
                "Proxy Address (with http protocol): qa.example.com",
                "Username (teleport username): ",
                "Is Need 2FA (Y/y/N/n): maybe",
            ]
        );
    }

    #[test]
    fn existing_env_is_rejected() {
        let mut config = Config::default();
        config.proxies.push(Proxy {
            env: "prod".to_string(),
            ..Proxy::default()
        });
        let mut prompter = Scripted::answers(&["prod"]);
        assert!(run_proxy_setup(&config, &mut prompter).is_err());
        assert_eq!(prompter.rejected, vec!["Environment: prod"]);
    }

    #[test]
    fn edit_loop_reopens_rejected_text_until_valid() {
        let current = Config::default();
        let mut prompter = Scripted {
            confirms: vec![true].into(),
            ..Scripted::default()
        };
        let mut seen = Vec::new();
        let mut edits = VecDeque::from(vec!["ssh_user = ", "ssh_user = \"admin\""]);
        let result = edit_until_valid(
            current.to_toml_string().unwrap(),
            &mut prompter,
            |text| {
                seen.push(text.to_string());
                Ok(edits.pop_front().unwrap_or_default().to_string())
            },
            |text| config::apply_edit_all(&current, text),
        )
        .unwrap();
        assert_eq!(result.map(|config| config.ssh_user), Some("admin".to_string()));
        assert_eq!(seen[1], "ssh_user = ");
    }

    #[test]
    fn edit_loop_stops_when_user_declines() {
        let current = Config::default();
        let mut prompter = Scripted {
            confirms: vec![false].into(),
            ..Scripted::default()
        };
        let result = edit_until_valid(
            String::new(),
            &mut prompter,
            |_| Ok("not toml [".to_string()),
            |text| config::apply_edit_all(&current, text),
        )
        .unwrap();
        assert!(result.is_none());
    }
}
