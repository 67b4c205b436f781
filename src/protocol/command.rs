#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    IsSubscribedApp,
    SubscribedItems,
    SubscribeItem,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::IsSubscribedApp => "apps.is_subscribed",
            Command::SubscribedItems => "workshop.subscribed_items",
            Command::SubscribeItem => "workshop.subscribe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ItemSubscribed,
    Unknown,
}

impl From<&str> for Event {
    fn from(s: &str) -> Self {
        match s {
            "item_subscribed" => Event::ItemSubscribed,
            _ => Event::Unknown,
        }
    }
}
