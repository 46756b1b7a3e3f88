//! Typed wrappers for the lexicon methods the bridge calls.

pub mod server {
    use crate::xrpc::{XrpcClient, XrpcError};
    use bskyproto::atproto::{CreateSessionInput, SessionOutput};

    pub const CREATE_SESSION: &str = "com.atproto.server.createSession";
    pub const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
    pub const DELETE_SESSION: &str = "com.atproto.server.deleteSession";

    pub async fn create_session(
        client: &XrpcClient,
        input: &CreateSessionInput,
    ) -> Result<SessionOutput, XrpcError> {
        client.procedure(CREATE_SESSION, Some(input)).await
    }

    /// The caller must place the refresh token in the access-token slot.
    pub async fn refresh_session(client: &XrpcClient) -> Result<SessionOutput, XrpcError> {
        client.procedure::<(), _>(REFRESH_SESSION, None).await
    }

    pub async fn delete_session(client: &XrpcClient) -> Result<(), XrpcError> {
        client.procedure_unit::<()>(DELETE_SESSION, None).await
    }
}

pub mod convo {
    use crate::xrpc::{XrpcClient, XrpcError};
    use bskyproto::chat::{
        ConvoOutput, GetLogOutput, GetMessagesOutput, ListConvosOutput, MessageView,
        SendMessageInput, UpdateReadInput,
    };

    pub const GET_LOG: &str = "chat.bsky.convo.getLog";
    pub const LIST_CONVOS: &str = "chat.bsky.convo.listConvos";
    pub const GET_CONVO: &str = "chat.bsky.convo.getConvo";
    pub const GET_MESSAGES: &str = "chat.bsky.convo.getMessages";
    pub const SEND_MESSAGE: &str = "chat.bsky.convo.sendMessage";
    pub const UPDATE_READ: &str = "chat.bsky.convo.updateRead";

    pub async fn get_log(client: &XrpcClient, cursor: &str) -> Result<GetLogOutput, XrpcError> {
        client
            .query(GET_LOG, &[("cursor", cursor.to_string())])
            .await
    }

    pub async fn list_convos(
        client: &XrpcClient,
        cursor: &str,
        limit: i64,
    ) -> Result<ListConvosOutput, XrpcError> {
        client
            .query(
                LIST_CONVOS,
                &[("cursor", cursor.to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    pub async fn get_convo(client: &XrpcClient, convo_id: &str) -> Result<ConvoOutput, XrpcError> {
        client
            .query(GET_CONVO, &[("convoId", convo_id.to_string())])
            .await
    }

    pub async fn get_messages(
        client: &XrpcClient,
        convo_id: &str,
        cursor: &str,
        limit: i64,
    ) -> Result<GetMessagesOutput, XrpcError> {
        client
            .query(
                GET_MESSAGES,
                &[
                    ("convoId", convo_id.to_string()),
                    ("cursor", cursor.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
    }

    pub async fn send_message(
        client: &XrpcClient,
        input: &SendMessageInput,
    ) -> Result<MessageView, XrpcError> {
        client.procedure(SEND_MESSAGE, Some(input)).await
    }

    pub async fn update_read(
        client: &XrpcClient,
        input: &UpdateReadInput,
    ) -> Result<ConvoOutput, XrpcError> {
        client.procedure(UPDATE_READ, Some(input)).await
    }
}

pub mod actor {
    use crate::xrpc::{XrpcClient, XrpcError};
    use bskyproto::actor::ProfileViewDetailed;

    pub const GET_PROFILE: &str = "app.bsky.actor.getProfile";

    pub async fn get_profile(
        client: &XrpcClient,
        actor: &str,
    ) -> Result<ProfileViewDetailed, XrpcError> {
        client
            .query(GET_PROFILE, &[("actor", actor.to_string())])
            .await
    }
}
